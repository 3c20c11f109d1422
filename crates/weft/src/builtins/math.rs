//! Math builtins (spec §4.4): `abs`, `floor`, `ceil`, `round`, `min`,
//! `max`, `sqrt`, `pow`, `clamp`, trig, `exp`, `log`, `ln`, `pi`.

use std::sync::Arc;

use super::define_host;
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind};
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "abs", Arc::new(|e, a| unary(e, a, "abs", f64::abs)));
    define_host(env, "floor", Arc::new(|e, a| unary(e, a, "floor", f64::floor)));
    define_host(env, "ceil", Arc::new(|e, a| unary(e, a, "ceil", f64::ceil)));
    define_host(env, "round", Arc::new(|e, a| unary(e, a, "round", f64::round)));
    define_host(env, "sqrt", Arc::new(|e, a| unary(e, a, "sqrt", f64::sqrt)));
    define_host(env, "sin", Arc::new(|e, a| unary(e, a, "sin", f64::sin)));
    define_host(env, "cos", Arc::new(|e, a| unary(e, a, "cos", f64::cos)));
    define_host(env, "tan", Arc::new(|e, a| unary(e, a, "tan", f64::tan)));
    define_host(env, "exp", Arc::new(|e, a| unary(e, a, "exp", f64::exp)));
    define_host(env, "ln", Arc::new(|e, a| unary(e, a, "ln", f64::ln)));
    define_host(env, "log", Arc::new(log));
    define_host(env, "pow", Arc::new(pow));
    define_host(env, "min", Arc::new(min));
    define_host(env, "max", Arc::new(max));
    define_host(env, "clamp", Arc::new(clamp));
    define_host(env, "pi", Arc::new(|_e, _a| Ok(Value::Number(std::f64::consts::PI))));
}

fn number_arg(eval: &Evaluator, args: &ArgMap, index: usize, fn_name: &str) -> EvalResult<f64> {
    match args.pos(index) {
        Some(Value::Number(n)) => Ok(*n),
        other => Err(eval.runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!("{fn_name}() expects a number, found {}", other.map_or("nil", Value::type_name)),
            eval.call_position,
        )),
    }
}

fn unary(eval: &mut Evaluator, args: &ArgMap, name: &str, f: impl Fn(f64) -> f64) -> EvalResult<Value> {
    Ok(Value::Number(f(number_arg(eval, args, 0, name)?)))
}

/// `log(x)` is base 10; `log(x, base)` uses the given base.
fn log(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let x = number_arg(eval, args, 0, "log")?;
    match args.pos(1) {
        Some(Value::Number(base)) => Ok(Value::Number(x.log(*base))),
        _ => Ok(Value::Number(x.log10())),
    }
}

fn pow(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let base = number_arg(eval, args, 0, "pow")?;
    let exp = number_arg(eval, args, 1, "pow")?;
    Ok(Value::Number(base.powf(exp)))
}

fn min(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    fold(eval, args, "min", f64::min)
}

fn max(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    fold(eval, args, "max", f64::max)
}

fn fold(eval: &mut Evaluator, args: &ArgMap, name: &str, f: impl Fn(f64, f64) -> f64) -> EvalResult<Value> {
    let values = args.all_positional();
    if values.is_empty() {
        return Err(eval.runtime_error(RuntimeErrorKind::BadArgument, format!("{name}() requires at least one argument"), eval.call_position));
    }
    let mut acc = match &values[0] {
        Value::Number(n) => *n,
        other => {
            return Err(eval.runtime_error(
                RuntimeErrorKind::TypeMismatch,
                format!("{name}() expects numbers, found {}", other.type_name()),
                eval.call_position,
            ))
        }
    };
    for v in &values[1..] {
        match v {
            Value::Number(n) => acc = f(acc, *n),
            other => {
                return Err(eval.runtime_error(
                    RuntimeErrorKind::TypeMismatch,
                    format!("{name}() expects numbers, found {}", other.type_name()),
                    eval.call_position,
                ))
            }
        }
    }
    Ok(Value::Number(acc))
}

fn clamp(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let x = number_arg(eval, args, 0, "clamp")?;
    let lo = number_arg(eval, args, 1, "clamp")?;
    let hi = number_arg(eval, args, 2, "clamp")?;
    Ok(Value::Number(x.clamp(lo.min(hi), lo.max(hi))))
}
