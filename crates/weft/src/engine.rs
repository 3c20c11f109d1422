//! Embedder façade (spec §6).
//!
//! Grounded on `ouros::run::Runner` for the public façade shape (parse +
//! execute behind one type, doctest-style `# Example` usage) and
//! `ouros-cli/src/main.rs` for how a host wires a runner up end to end.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::builtins;
use crate::capability::CapabilitySet;
use crate::config::EngineConfig;
use crate::datastore::Registry as DatastoreRegistry;
use crate::env::EnvHandle;
use crate::error::ScriptError;
use crate::eval::Evaluator;
use crate::function::{FunctionValue, HostFn, HostFunction};
use crate::parser;
use crate::resource::RecursionGuard;
use crate::tracer::{EvalTracer, NoopTracer};
use crate::value::Value;

/// Capability hooks the embedder supplies: script loading, file I/O,
/// stdout/stdin, and environment-variable reads (spec §6). A host that
/// wants to sandbox a script supplies a restrictive implementation; the
/// default mirrors the process's own stdio/filesystem/env.
pub trait Hooks: Send + Sync {
    fn read_file(&self, path: &str) -> std::io::Result<String>;
    fn write_file(&self, path: &str, contents: &str) -> std::io::Result<()>;
    fn file_exists(&self, path: &str) -> bool;
    fn write_stdout(&self, text: &str);
    fn read_stdin_line(&self) -> Option<String>;
    fn read_env_var(&self, name: &str) -> Option<String>;
}

/// The default [`Hooks`] implementation: real filesystem, real stdio,
/// real process environment.
#[derive(Debug, Default)]
pub struct DefaultHooks;

impl Hooks for DefaultHooks {
    fn read_file(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_file(&self, path: &str, contents: &str) -> std::io::Result<()> {
        std::fs::write(path, contents)
    }

    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn write_stdout(&self, text: &str) {
        use std::io::Write;
        let _ = std::io::stdout().write_all(text.as_bytes());
    }

    fn read_stdin_line(&self) -> Option<String> {
        use std::io::BufRead;
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(_) => None,
        }
    }

    fn read_env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A [`Hooks`] implementation that captures stdout writes in memory rather
/// than touching the real terminal. Used by this crate's own tests and by
/// any host that wants to collect a script's output rather than stream it.
#[derive(Debug, Default)]
pub struct CollectingHooks {
    stdout: Mutex<String>,
}

impl CollectingHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written to stdout so far.
    #[must_use]
    pub fn output(&self) -> String {
        self.stdout.lock().unwrap().clone()
    }
}

impl Hooks for CollectingHooks {
    fn read_file(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_file(&self, path: &str, contents: &str) -> std::io::Result<()> {
        std::fs::write(path, contents)
    }

    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn write_stdout(&self, text: &str) {
        self.stdout.lock().unwrap().push_str(text);
    }

    fn read_stdin_line(&self) -> Option<String> {
        None
    }

    fn read_env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// The embedder's entry point: owns the global scope (builtins plus
/// whatever the host registers), capability grants, I/O hooks, the debug
/// tracer, and the process-wide datastore registry.
pub struct Engine {
    globals: EnvHandle,
    hooks: Arc<dyn Hooks>,
    capabilities: CapabilitySet,
    tracer: Arc<dyn EvalTracer>,
    datastores: Arc<DatastoreRegistry>,
    script_dir: Option<PathBuf>,
    max_recursion_depth: Option<usize>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// A fresh engine with every default builtin installed, full
    /// capabilities, a no-op tracer, and the default (real) hooks.
    ///
    /// # Example
    /// ```
    /// let engine = weft::Engine::new();
    /// engine.execute("print(1 + 1)", "inline").unwrap();
    /// ```
    #[must_use]
    pub fn new() -> Self {
        let globals = EnvHandle::root();
        builtins::install(&globals);
        let datastores = Arc::new(DatastoreRegistry::new());
        spawn_persist_timer(Arc::downgrade(&datastores));
        Self {
            globals,
            hooks: Arc::new(DefaultHooks),
            capabilities: CapabilitySet::all(),
            tracer: Arc::new(NoopTracer),
            datastores,
            script_dir: None,
            max_recursion_depth: None,
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn EvalTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Applies an [`EngineConfig`] in one call, e.g. from `weft-cli`'s
    /// argument parsing. Each `None` field leaves the current setting
    /// (built-in default) untouched.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        if let Some(dir) = config.script_dir {
            self.script_dir = Some(dir);
        }
        self.max_recursion_depth = config.max_recursion_depth;
        self.capabilities = config.capabilities;
        self
    }

    pub fn set_script_dir(&mut self, path: impl Into<PathBuf>) {
        self.script_dir = Some(path.into());
    }

    /// Registers a single host function, callable by name from script.
    pub fn register_function(&self, name: &str, func: HostFn) {
        self.globals.define(name, Value::Function(Arc::new(FunctionValue::Host(HostFunction { name: name.to_string(), func }))));
    }

    /// Registers an object whose fields are host-function methods, e.g.
    /// an HTTP client or a custom collaborator surface.
    pub fn register_object(&self, name: &str, methods: impl IntoIterator<Item = (&'static str, HostFn)>) {
        let mut fields = indexmap::IndexMap::new();
        for (method_name, func) in methods {
            fields.insert(
                method_name.to_string(),
                Value::Function(Arc::new(FunctionValue::Host(HostFunction { name: format!("{name}.{method_name}"), func }))),
            );
        }
        self.globals.define(name, Value::object(fields));
    }

    fn make_evaluator(&self, file: Arc<str>) -> Evaluator {
        let mut evaluator = Evaluator::new(
            self.globals.child(),
            file,
            self.tracer.clone(),
            self.capabilities,
            self.hooks.clone(),
            self.datastores.clone(),
        );
        evaluator.script_dir = self.script_dir.clone();
        if let Some(depth) = self.max_recursion_depth {
            evaluator.recursion = RecursionGuard::with_max_depth(depth);
        }
        evaluator
    }

    /// Parses and runs `source` to completion.
    pub fn execute(&self, source: &str, file: &str) -> Result<(), ScriptError> {
        let program = parser::parse(source, file)?;
        let mut evaluator = self.make_evaluator(file.into());
        evaluator.run_program(&program)
    }

    /// Reads `path` via the configured [`Hooks`] and executes it.
    pub fn execute_file(&self, path: &Path) -> Result<(), ScriptError> {
        let display = path.display().to_string();
        let source = self.hooks.read_file(&display).map_err(|e| {
            crate::error::RuntimeError::new(
                crate::error::RuntimeErrorKind::HostFailure,
                format!("failed to read '{display}': {e}"),
                display.clone().into(),
                crate::error::Position::default(),
            )
        })?;
        self.execute(&source, &display)
    }

    /// Evaluates `source` as a single expression-or-statements fragment
    /// inside `env`, returning the last expression's value. Used by a
    /// debug REPL to evaluate watch expressions or user input against a
    /// captured breakpoint scope (spec §6).
    pub fn eval_in_environment(&self, source: &str, env: EnvHandle, file: &str) -> Result<Value, ScriptError> {
        let program = parser::parse(source, file)?;
        let mut evaluator = Evaluator::new(env, file.into(), self.tracer.clone(), self.capabilities, self.hooks.clone(), self.datastores.clone());
        if let Some(depth) = self.max_recursion_depth {
            evaluator.recursion = RecursionGuard::with_max_depth(depth);
        }
        let mut last = Value::Nil;
        for stmt in &program.statements {
            match evaluator.eval_single_statement(stmt) {
                Ok(v) => last = v,
                Err(e) => return Err(e),
            }
        }
        Ok(last)
    }

    #[must_use]
    pub fn datastores(&self) -> Arc<DatastoreRegistry> {
        self.datastores.clone()
    }
}

/// Drives any namespace's `persist_interval` flush (spec §4.7). Holds only
/// a [`std::sync::Weak`] reference so the thread exits on its own once the
/// owning `Engine` (and every clone of its registry handle) is dropped.
fn spawn_persist_timer(registry: std::sync::Weak<DatastoreRegistry>) {
    std::thread::spawn(move || loop {
        std::thread::sleep(std::time::Duration::from_millis(500));
        let Some(registry) = registry.upgrade() else { return };
        registry.tick_persist();
    });
}
