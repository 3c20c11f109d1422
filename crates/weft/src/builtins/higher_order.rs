//! `map`, `filter`, `reduce` (spec §4.4): the only builtins that recurse
//! back into the evaluator to invoke a script callback.

use std::sync::Arc;

use super::define_host;
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind};
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "map", Arc::new(map));
    define_host(env, "filter", Arc::new(filter));
    define_host(env, "reduce", Arc::new(reduce));
}

fn callback(args: &ArgMap, index: usize) -> Option<Arc<crate::function::FunctionValue>> {
    match args.pos(index) {
        Some(Value::Function(f)) => Some(f.clone()),
        _ => None,
    }
}

fn map(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::Array(a)) = args.pos(0) else { return type_error(eval, "map") };
    let Some(f) = callback(args, 1) else { return callback_error(eval, "map") };
    let items = a.lock().unwrap().clone();
    let position = eval.call_position;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let mapped = eval.call_function(f.clone(), vec![item], ahash::AHashMap::new(), None, position)?;
        out.push(mapped);
    }
    Ok(Value::array(out))
}

fn filter(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::Array(a)) = args.pos(0) else { return type_error(eval, "filter") };
    let Some(f) = callback(args, 1) else { return callback_error(eval, "filter") };
    let items = a.lock().unwrap().clone();
    let position = eval.call_position;
    let mut out = Vec::new();
    for item in items {
        let keep = eval.call_function(f.clone(), vec![item.clone()], ahash::AHashMap::new(), None, position)?.is_truthy();
        if keep {
            out.push(item);
        }
    }
    Ok(Value::array(out))
}

fn reduce(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::Array(a)) = args.pos(0) else { return type_error(eval, "reduce") };
    let Some(f) = callback(args, 1) else { return callback_error(eval, "reduce") };
    let items = a.lock().unwrap().clone();
    let position = eval.call_position;
    let mut iter = items.into_iter();
    let mut acc = match args.pos(2) {
        Some(v) => v.clone(),
        None => iter.next().unwrap_or(Value::Nil),
    };
    for item in iter {
        acc = eval.call_function(f.clone(), vec![acc, item], ahash::AHashMap::new(), None, position)?;
    }
    Ok(acc)
}

fn type_error(eval: &Evaluator, fn_name: &str) -> EvalResult<Value> {
    Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, format!("{fn_name}() expects an array as its first argument"), eval.call_position))
}

fn callback_error(eval: &Evaluator, fn_name: &str) -> EvalResult<Value> {
    Err(eval.runtime_error(RuntimeErrorKind::BadArgument, format!("{fn_name}() expects a function as its second argument"), eval.call_position))
}
