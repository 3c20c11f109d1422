//! `type`, `tonumber`, `tostring`, `tobool` (spec §4.4).

use std::sync::Arc;

use super::define_host;
use crate::env::EnvHandle;
use crate::error::EvalResult;
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "type", Arc::new(type_of));
    define_host(env, "tonumber", Arc::new(tonumber));
    define_host(env, "tostring", Arc::new(tostring));
    define_host(env, "tobool", Arc::new(tobool));
}

fn type_of(_eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    Ok(Value::string(args.pos(0).map_or("nil", Value::type_name)))
}

/// Numbers pass through; strings parse (trimmed, standard float syntax);
/// everything else is `nil` (spec §4.4).
fn tonumber(_eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    match args.pos(0) {
        Some(Value::Number(n)) => Ok(Value::Number(*n)),
        Some(Value::String(s)) => Ok(s.trim().parse::<f64>().map(Value::Number).unwrap_or(Value::Nil)),
        Some(Value::Bool(b)) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
        _ => Ok(Value::Nil),
    }
}

fn tostring(_eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    Ok(Value::string(args.pos(0).map_or_else(|| "nil".to_string(), ToString::to_string)))
}

fn tobool(_eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    Ok(Value::Bool(args.pos(0).is_some_and(Value::is_truthy)))
}
