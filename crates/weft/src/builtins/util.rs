//! `range`, `random`, `uuid`, and the `template(str)` template-function
//! factory (spec §4.3.4, §4.4).

use std::sync::Arc;

use rand::Rng;

use super::define_host;
use crate::ast::{ExprKind, TemplatePart};
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind, Unwind};
use crate::eval::Evaluator;
use crate::function::{ArgMap, FunctionValue, HostFunction};
use crate::parser;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "range", Arc::new(range));
    define_host(env, "random", Arc::new(random));
    define_host(env, "uuid", Arc::new(uuid));
    define_host(env, "template", Arc::new(template));
}

/// `range(end)`, `range(start, end)`, `range(start, end, step)` — an
/// array of integers, half-open at `end`.
fn range(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let values = args.all_positional();
    let (start, end, step) = match values.len() {
        1 => (0.0, number(eval, &values[0])?, 1.0),
        2 => (number(eval, &values[0])?, number(eval, &values[1])?, 1.0),
        _ => (number(eval, &values[0])?, number(eval, &values[1])?, number(eval, &values[2])?),
    };
    if step == 0.0 {
        return Err(eval.runtime_error(RuntimeErrorKind::BadArgument, "range() step cannot be zero", eval.call_position));
    }
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0.0 && i < end) || (step < 0.0 && i > end) {
        out.push(Value::Number(i));
        i += step;
    }
    Ok(Value::array(out))
}

fn number(eval: &Evaluator, v: &Value) -> EvalResult<f64> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(eval.runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!("range() expects numbers, found {}", other.type_name()),
            eval.call_position,
        )),
    }
}

/// `random()` in `[0, 1)`; `random(n)` in `[0, n)`; `random(lo, hi)` in
/// `[lo, hi)`.
fn random(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let mut rng = rand::thread_rng();
    match (args.pos(0), args.pos(1)) {
        (None, _) => Ok(Value::Number(rng.gen::<f64>())),
        (Some(Value::Number(hi)), None) => Ok(Value::Number(rng.gen_range(0.0..*hi))),
        (Some(Value::Number(lo)), Some(Value::Number(hi))) => Ok(Value::Number(rng.gen_range(*lo..*hi))),
        _ => Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "random() expects numeric bounds", eval.call_position)),
    }
}

fn uuid(_eval: &mut Evaluator, _args: &ArgMap) -> EvalResult<Value> {
    Ok(Value::string(uuid::Uuid::now_v7().to_string()))
}

/// Compiles `str` into a reusable host function: called later with named
/// arguments only, it evaluates the template in a fresh, parentless
/// environment containing just those bindings, so any name it doesn't
/// recognize renders back as the literal `{{name}}` rather than failing
/// (spec §4.3.4).
fn template(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::String(s)) = args.pos(0) else {
        return Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "template() expects a string", eval.call_position));
    };
    if !s.contains("{{") {
        return Err(eval.runtime_error(RuntimeErrorKind::BadArgument, "template() requires a string containing '{{'", eval.call_position));
    }
    let parts = parser::parse_template_parts(s, &eval.file, eval.call_position).map_err(Unwind::from)?;
    let parts = Arc::new(parts);
    let func: crate::function::HostFn = Arc::new(move |eval: &mut Evaluator, call_args: &ArgMap| render_template(eval, &parts, call_args));
    Ok(Value::Function(Arc::new(FunctionValue::Host(HostFunction { name: "<template>".to_string(), func }))))
}

fn render_template(eval: &mut Evaluator, parts: &[TemplatePart], call_args: &ArgMap) -> EvalResult<Value> {
    let scope = EnvHandle::root();
    for i in 0..call_args.positional_count() {
        if let Some(v) = call_args.pos(i) {
            scope.define(i.to_string(), v.clone());
        }
    }
    let mut out = String::new();
    for part in parts {
        match part {
            TemplatePart::Text(t) => out.push_str(t),
            TemplatePart::Expr(expr) => {
                // A bare identifier unknown to this call renders literally
                // as `{{name}}` rather than failing (spec §4.3.4); any
                // richer expression is evaluated against only the supplied
                // named arguments and fails normally if it reaches outside
                // that scope.
                if let ExprKind::Identifier(name) = &expr.kind {
                    match call_args.get(name) {
                        Some(v) => out.push_str(&v.to_string()),
                        None => {
                            out.push_str("{{");
                            out.push_str(name);
                            out.push_str("}}");
                        }
                    }
                } else {
                    let previous = std::mem::replace(&mut eval.env, scope.clone());
                    let result = eval.eval_expr(expr);
                    eval.env = previous;
                    out.push_str(&result?.to_string());
                }
            }
        }
    }
    Ok(Value::string(out))
}
