//! `len`, `keys`, `values`, `push`/`pop`/`shift`/`unshift`, `sort` (spec §4.4).

use std::sync::Arc;

use super::define_host;
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind};
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "len", Arc::new(len));
    define_host(env, "keys", Arc::new(keys));
    define_host(env, "values", Arc::new(values));
    define_host(env, "push", Arc::new(push));
    define_host(env, "pop", Arc::new(pop));
    define_host(env, "shift", Arc::new(shift));
    define_host(env, "unshift", Arc::new(unshift));
    define_host(env, "sort", Arc::new(sort));
    define_host(env, "deep_copy", Arc::new(deep_copy));
}

fn len(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    match args.pos(0) {
        None | Some(Value::Nil) => Ok(Value::Number(0.0)),
        Some(Value::Array(a)) => Ok(Value::Number(a.lock().unwrap().len() as f64)),
        Some(Value::Object(o)) => Ok(Value::Number(o.lock().unwrap().len() as f64)),
        Some(Value::String(s)) => Ok(Value::Number(s.len() as f64)),
        Some(other) => Err(eval.runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!("len() does not apply to {}", other.type_name()),
            eval.call_position,
        )),
    }
}

fn keys(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    match args.pos(0) {
        Some(Value::Object(o)) => Ok(Value::array(o.lock().unwrap().keys().map(|k| Value::string(k.as_str())).collect())),
        other => type_error(eval, "keys", other),
    }
}

fn values(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    match args.pos(0) {
        Some(Value::Object(o)) => Ok(Value::array(o.lock().unwrap().values().cloned().collect())),
        other => type_error(eval, "values", other),
    }
}

fn push(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    match args.pos(0) {
        Some(Value::Array(a)) => {
            let item = args.pos(1).cloned().unwrap_or(Value::Nil);
            let mut items = a.lock().unwrap();
            items.push(item);
            Ok(Value::Number(items.len() as f64))
        }
        other => type_error(eval, "push", other),
    }
}

fn pop(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    match args.pos(0) {
        Some(Value::Array(a)) => Ok(a.lock().unwrap().pop().unwrap_or(Value::Nil)),
        other => type_error(eval, "pop", other),
    }
}

fn shift(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    match args.pos(0) {
        Some(Value::Array(a)) => {
            let mut items = a.lock().unwrap();
            if items.is_empty() {
                Ok(Value::Nil)
            } else {
                Ok(items.remove(0))
            }
        }
        other => type_error(eval, "shift", other),
    }
}

fn unshift(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    match args.pos(0) {
        Some(Value::Array(a)) => {
            let item = args.pos(1).cloned().unwrap_or(Value::Nil);
            let mut items = a.lock().unwrap();
            items.insert(0, item);
            Ok(Value::Number(items.len() as f64))
        }
        other => type_error(eval, "unshift", other),
    }
}

/// Returns a new sorted array; with a comparator `cmp(a, b)`, its
/// truthiness means "a < b" (spec §4.4).
fn sort(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::Array(a)) = args.pos(0) else { return type_error(eval, "sort", args.pos(0)) };
    let mut items = a.lock().unwrap().clone();
    if let Some(Value::Function(f)) = args.pos(1).cloned() {
        // Insertion sort: only needs a "less than" truthiness test, no
        // total-order trait bound on Value, and the arrays this targets
        // are short (operational-automation data, not bulk datasets).
        for i in 1..items.len() {
            let mut j = i;
            while j > 0 {
                let less = eval
                    .call_function(f.clone(), vec![items[j].clone(), items[j - 1].clone()], ahash::AHashMap::new(), None, eval.call_position)?
                    .is_truthy();
                if less {
                    items.swap(j, j - 1);
                    j -= 1;
                } else {
                    break;
                }
            }
        }
    } else {
        items.sort_by(|a, b| default_order(a, b));
    }
    Ok(Value::array(items))
}

fn default_order(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => std::cmp::Ordering::Equal,
    }
}

/// Recursive copy of arrays/objects with functions stripped (spec §4.4).
fn deep_copy(_eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    Ok(args.pos(0).map(Value::deep_copy).unwrap_or(Value::Nil))
}

fn type_error(eval: &Evaluator, fn_name: &str, value: Option<&Value>) -> EvalResult<Value> {
    let found = value.map_or("nil", Value::type_name);
    Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, format!("{fn_name}() does not apply to {found}"), eval.call_position))
}
