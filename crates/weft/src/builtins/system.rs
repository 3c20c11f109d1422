//! `exit`, `throw` (spec §4.4, §7): the two builtins that unwind with a
//! signal other than a plain return value.

use std::sync::Arc;

use super::define_host;
use crate::capability::Capability;
use crate::env::EnvHandle;
use crate::error::{EvalResult, ThrownValue, Unwind};
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "exit", Arc::new(exit));
    define_host(env, "throw", Arc::new(throw));
}

/// Unwinds the whole script with a distinguished signal carrying
/// deep-copied return values (spec §7); caught only at
/// [`Evaluator::run_program`], never by `try/catch`.
fn exit(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    eval.capabilities.require(Capability::ProcessExit, &eval.file, eval.call_position)?;
    let values = args.all_positional().into_iter().map(|v| v.deep_copy()).collect();
    Err(Unwind::Exit(values))
}

/// Unwinds with a typed error carrying the original value (by identity,
/// not a stringified copy), the file, position, and call stack at the
/// throw site (spec §7).
fn throw(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let value = args.pos(0).cloned().unwrap_or(Value::Nil);
    let thrown = ThrownValue { value, file: eval.file.clone(), position: eval.call_position, call_stack: eval.call_stack.clone() };
    Err(Unwind::Error(crate::error::ScriptError::Thrown(thrown)))
}
