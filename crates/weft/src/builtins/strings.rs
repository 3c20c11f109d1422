//! String builtins (spec §4.4): `upper`, `lower`, `trim`, `substr`,
//! `split`, `join`, `contains`, `find`, `replace` — `contains`/`find`/
//! `replace` take their pattern argument as a regular expression.

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use super::define_host;
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind};
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "upper", Arc::new(upper));
    define_host(env, "lower", Arc::new(lower));
    define_host(env, "trim", Arc::new(trim));
    define_host(env, "substr", Arc::new(substr));
    define_host(env, "split", Arc::new(split));
    define_host(env, "join", Arc::new(join));
    define_host(env, "contains", Arc::new(contains));
    define_host(env, "find", Arc::new(find));
    define_host(env, "replace", Arc::new(replace));
}

fn string_arg(eval: &Evaluator, args: &ArgMap, index: usize, fn_name: &str) -> EvalResult<Arc<str>> {
    match args.pos(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(eval.runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!("{fn_name}() expects a string, found {}", other.map_or("nil", Value::type_name)),
            eval.call_position,
        )),
    }
}

/// `string_arg`'s coercing counterpart for `upper`/`lower`, which accept
/// any value and render it the way `tostring` would (spec §4.4).
fn string_like_arg(args: &ArgMap, index: usize) -> String {
    args.pos(index).map_or_else(|| "nil".to_string(), ToString::to_string)
}

fn flag_is_set(args: &ArgMap, index: usize) -> bool {
    args.pos(index).is_some_and(Value::is_truthy)
}

/// Compiles `pattern` as a regex, prefixing `(?i)` when `ignore_case` is
/// set (the case-insensitivity idiom used throughout this crate's regex
/// surface).
fn compile_pattern(eval: &Evaluator, pattern: &str, ignore_case: bool, fn_name: &str) -> EvalResult<Regex> {
    let full_pattern = if ignore_case { format!("(?i){pattern}") } else { pattern.to_string() };
    Regex::new(&full_pattern)
        .map_err(|e| eval.runtime_error(RuntimeErrorKind::BadArgument, format!("{fn_name}() received an invalid pattern: {e}"), eval.call_position))
}

fn upper(_eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    Ok(Value::string(string_like_arg(args, 0).to_uppercase()))
}

fn lower(_eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    Ok(Value::string(string_like_arg(args, 0).to_lowercase()))
}

fn trim(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    Ok(Value::string(string_arg(eval, args, 0, "trim")?.trim().to_string()))
}

/// `substr(s, start, len?)`, byte-indexed. A negative `start` counts back
/// from the end of the string; either end of the range clamps to the
/// string's bounds rather than erroring (spec §4.4).
fn substr(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let s = string_arg(eval, args, 0, "substr")?;
    let start = match args.pos(1) {
        Some(Value::Number(n)) if *n < 0.0 => s.len().saturating_sub((-*n) as usize),
        Some(Value::Number(n)) => (*n) as usize,
        _ => 0,
    };
    let start = start.min(s.len());
    let end = match args.pos(2) {
        Some(Value::Number(n)) => start.saturating_add((*n).max(0.0) as usize).min(s.len()),
        _ => s.len(),
    };
    Ok(Value::string(s.get(start..end).unwrap_or("").to_string()))
}

fn split(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let s = string_arg(eval, args, 0, "split")?;
    let sep = string_arg(eval, args, 1, "split")?;
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(sep.as_ref()).map(Value::string).collect()
    };
    Ok(Value::array(parts))
}

fn join(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::Array(a)) = args.pos(0) else {
        return Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "join() expects an array as its first argument", eval.call_position));
    };
    let sep = match args.pos(1) {
        Some(Value::String(s)) => s.to_string(),
        _ => String::new(),
    };
    let items = a.lock().unwrap();
    let joined = items.iter().map(ToString::to_string).collect::<Vec<_>>().join(&sep);
    Ok(Value::string(joined))
}

/// `contains(s, pat, ignore_case?)`: `pat` is a regex, matched anywhere in
/// `s` (spec §4.4).
fn contains(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let s = string_arg(eval, args, 0, "contains")?;
    let pattern = string_arg(eval, args, 1, "contains")?;
    let re = compile_pattern(eval, &pattern, flag_is_set(args, 2), "contains")?;
    Ok(Value::Bool(re.is_match(&s)))
}

/// `find(s, pat, ignore_case?)`: every match of `pat` in `s`, as an array
/// of `{text, pos, len}` records (spec §4.4).
fn find(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let s = string_arg(eval, args, 0, "find")?;
    let pattern = string_arg(eval, args, 1, "find")?;
    let re = compile_pattern(eval, &pattern, flag_is_set(args, 2), "find")?;
    let matches = re
        .find_iter(&s)
        .map(|m| {
            let mut record = IndexMap::new();
            record.insert("text".to_string(), Value::string(m.as_str()));
            record.insert("pos".to_string(), Value::Number(m.start() as f64));
            record.insert("len".to_string(), Value::Number(m.len() as f64));
            Value::object(record)
        })
        .collect();
    Ok(Value::array(matches))
}

/// `replace(s, pat, repl, ignore_case?)`: replaces every match of `pat` in
/// `s`. `repl` is either a literal string (supporting `$1`-style capture
/// references) or a callback invoked per match as `(text, pos, len)` whose
/// return value is coerced to a string (spec §4.4).
fn replace(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let s = string_arg(eval, args, 0, "replace")?;
    let pattern = string_arg(eval, args, 1, "replace")?;
    let re = compile_pattern(eval, &pattern, flag_is_set(args, 3), "replace")?;

    match args.pos(2) {
        Some(Value::Function(repl)) => {
            let repl = repl.clone();
            let position = eval.call_position;
            let mut result = String::new();
            let mut last_end = 0;
            for m in re.find_iter(&s) {
                result.push_str(&s[last_end..m.start()]);
                let outcome = eval.call_function(
                    repl.clone(),
                    vec![Value::string(m.as_str()), Value::Number(m.start() as f64), Value::Number(m.len() as f64)],
                    ahash::AHashMap::new(),
                    None,
                    position,
                )?;
                result.push_str(&outcome.to_string());
                last_end = m.end();
            }
            result.push_str(&s[last_end..]);
            Ok(Value::string(result))
        }
        Some(Value::String(with)) => Ok(Value::string(re.replace_all(&s, with.as_ref()).into_owned())),
        other => Err(eval.runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!("replace() expects a string or function replacement, found {}", other.map_or("nil", Value::type_name)),
            eval.call_position,
        )),
    }
}
