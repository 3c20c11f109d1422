//! Command-line runner for weft scripts (spec §6).
//!
//! Grounded on `ouros-cli/src/main.rs`'s read-file-then-run shape, wired
//! through `clap` instead of raw `env::args` for flag parsing.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use weft::{Engine, StderrTracer};

#[derive(Parser)]
#[command(name = "weft", about = "Run a weft script", version)]
struct Cli {
    /// Script file to execute.
    script: PathBuf,

    /// Print breakpoint/watch debug events to stderr as they fire.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut engine = Engine::new();
    if cli.debug {
        engine = engine.with_tracer(Arc::new(StderrTracer));
    }
    if let Some(dir) = cli.script.parent().filter(|p| !p.as_os_str().is_empty()) {
        engine.set_script_dir(dir);
    }

    match engine.execute_file(&cli.script) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
