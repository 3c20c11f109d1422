//! `now`, `format_time`, `parse_time`, `sleep` (spec §4.4), backed by
//! `chrono` for calendar arithmetic and formatting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::define_host;
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind};
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "now", Arc::new(now));
    define_host(env, "format_time", Arc::new(format_time));
    define_host(env, "parse_time", Arc::new(parse_time));
    define_host(env, "sleep", Arc::new(sleep));
}

/// Unix epoch milliseconds (spec §4.4).
fn now(_eval: &mut Evaluator, _args: &ArgMap) -> EvalResult<Value> {
    let since_epoch = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    Ok(Value::Number(since_epoch.as_millis() as f64))
}

/// Translates one of the preset tags to a `chrono` strftime pattern, or
/// rewrites `YYYY MM DD HH mm ss`-style placeholders into one.
fn resolve_format(fmt: &str) -> String {
    match fmt {
        "iso" => "%Y-%m-%dT%H:%M:%S%.3f%:z".to_string(),
        "date" => "%Y-%m-%d".to_string(),
        "time" => "%H:%M:%S".to_string(),
        "long_date" => "%B %-d, %Y".to_string(),
        "long_date_dow" => "%A, %B %-d, %Y".to_string(),
        "short_date" => "%m/%d/%y".to_string(),
        "short_date_dow" => "%a %m/%d/%y".to_string(),
        custom => translate_placeholders(custom),
    }
}

/// `YYYY YY MM DD HH mm ss` substitution, longest tokens first so `YYYY`
/// isn't partially consumed by a `YY` match.
fn translate_placeholders(fmt: &str) -> String {
    fmt.replace("YYYY", "%Y")
        .replace("YY", "%y")
        .replace("MM", "%m")
        .replace("DD", "%d")
        .replace("HH", "%H")
        .replace("mm", "%M")
        .replace("ss", "%S")
}

fn format_time(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::Number(millis)) = args.pos(0) else {
        return Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "format_time() expects epoch milliseconds", eval.call_position));
    };
    let dt = epoch_to_datetime(eval, *millis)?;
    let pattern = match args.pos(1) {
        Some(Value::String(fmt)) => resolve_format(fmt),
        _ => resolve_format("iso"),
    };
    Ok(Value::string(dt.format(&pattern).to_string()))
}

/// Common formats tried in order when no explicit format is given.
const FALLBACK_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

fn parse_time(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::String(s)) = args.pos(0) else {
        return Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "parse_time() expects a string", eval.call_position));
    };
    if let Some(Value::String(fmt)) = args.pos(1) {
        let pattern = translate_placeholders(fmt);
        return parse_with(s, &pattern)
            .map(|ms| Value::Number(ms))
            .ok_or_else(|| eval.runtime_error(RuntimeErrorKind::BadArgument, format!("'{s}' does not match format '{fmt}'"), eval.call_position));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Value::Number(dt.timestamp_millis() as f64));
    }
    for pattern in FALLBACK_FORMATS {
        if let Some(ms) = parse_with(s, pattern) {
            return Ok(Value::Number(ms));
        }
    }
    Err(eval.runtime_error(RuntimeErrorKind::BadArgument, format!("could not parse '{s}' as a timestamp"), eval.call_position))
}

fn parse_with(s: &str, pattern: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_str(s, pattern) {
        return Some(dt.timestamp_millis() as f64);
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, pattern) {
        return Some(naive.and_utc().timestamp_millis() as f64);
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, pattern) {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis() as f64);
    }
    None
}

fn epoch_to_datetime(eval: &Evaluator, millis: f64) -> EvalResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis as i64)
        .ok_or_else(|| eval.runtime_error(RuntimeErrorKind::BadArgument, "epoch milliseconds out of range", eval.call_position))
}

/// Blocks the calling thread for the given number of seconds. Under
/// `parallel`, this blocks only the worker thread running the current
/// task, not its siblings (spec §4.5).
fn sleep(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::Number(secs)) = args.pos(0) else {
        return Ok(Value::Nil);
    };
    if *secs > 0.0 {
        std::thread::sleep(Duration::from_secs_f64(*secs));
    }
    Ok(Value::Nil)
}
