//! `print`, `input` (spec §4.4).

use std::sync::Arc;

use super::define_host;
use crate::capability::Capability;
use crate::env::EnvHandle;
use crate::error::EvalResult;
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "print", Arc::new(print));
    define_host(env, "input", Arc::new(input));
}

/// Joins string representations of every argument with spaces and writes
/// a line.
fn print(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let text = args.all_positional().iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
    eval.capabilities.require(Capability::StdoutWrite, &eval.file, eval.call_position)?;
    eval.hooks.write_stdout(&text);
    eval.hooks.write_stdout("\n");
    Ok(Value::Nil)
}

/// Writes an optional prompt, reads one line from stdin with CR/LF
/// stripped; nil at EOF; `""` if stdin is disabled for this embedding.
fn input(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    if let Some(prompt) = args.pos(0) {
        eval.capabilities.require(Capability::StdoutWrite, &eval.file, eval.call_position)?;
        eval.hooks.write_stdout(&prompt.to_string());
    }
    if !eval.capabilities.has(Capability::StdinRead) {
        return Ok(Value::string(""));
    }
    match eval.hooks.read_stdin_line() {
        Some(mut line) => {
            while line.ends_with(['\n', '\r']) {
                line.pop();
            }
            Ok(Value::string(line))
        }
        None => Ok(Value::Nil),
    }
}
