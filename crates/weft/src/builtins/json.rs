//! `parse_json`, `format_json` (spec §4.4), backed by `serde_json`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as Json;

use super::define_host;
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind};
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "parse_json", Arc::new(parse_json));
    define_host(env, "format_json", Arc::new(format_json));
}

fn parse_json(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::String(s)) = args.pos(0) else {
        return Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "parse_json() expects a string", eval.call_position));
    };
    match serde_json::from_str::<Json>(s) {
        Ok(json) => Ok(json_to_value(&json)),
        Err(e) => Err(eval.runtime_error(RuntimeErrorKind::BadArgument, format!("invalid JSON: {e}"), eval.call_position)),
    }
}

fn format_json(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(v) = args.pos(0) else {
        return Ok(Value::string("null"));
    };
    let pretty = args.pos(1).is_some_and(Value::is_truthy);
    let json = value_to_json(v);
    let text = if pretty { serde_json::to_string_pretty(&json) } else { serde_json::to_string(&json) };
    match text {
        Ok(t) => Ok(Value::string(t)),
        Err(e) => Err(eval.runtime_error(RuntimeErrorKind::HostFailure, format!("failed to format JSON: {e}"), eval.call_position)),
    }
}

pub(crate) fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::string(s.as_str()),
        Json::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        Json::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(k.clone(), json_to_value(v));
            }
            Value::object(out)
        }
    }
}

pub(crate) fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.to_string()),
        Value::Array(a) => Json::Array(a.lock().unwrap().iter().map(value_to_json).collect()),
        Value::Object(o) => {
            let mut map = serde_json::Map::new();
            for (k, v) in o.lock().unwrap().iter() {
                map.insert(k.clone(), value_to_json(v));
            }
            Json::Object(map)
        }
        Value::Function(f) => Json::String(format!("<function {}>", f.display_name())),
    }
}
