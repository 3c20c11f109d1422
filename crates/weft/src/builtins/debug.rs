//! `breakpoint`, `watch` (spec §4.4, §6): emit a [`DebugEvent`] only when
//! the configured tracer is enabled and the embedder granted
//! [`Capability::DebugEvents`].

use std::sync::Arc;

use super::define_host;
use crate::capability::Capability;
use crate::env::EnvHandle;
use crate::error::EvalResult;
use crate::eval::Evaluator;
use crate::function::ArgMap;
use crate::tracer::DebugEvent;
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "breakpoint", Arc::new(breakpoint));
    define_host(env, "watch", Arc::new(watch));
}

fn breakpoint(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    if eval.capabilities.has(Capability::DebugEvents) && eval.tracer.is_enabled() {
        let message = args.all_positional().iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
        eval.tracer.on_event(&DebugEvent {
            file: eval.file.clone(),
            position: eval.call_position,
            message,
            call_stack: eval.call_stack.clone(),
            env: eval.env.clone(),
            watch: None,
        });
    }
    Ok(Value::Nil)
}

/// Each argument is a watch-expression *source string*, re-evaluated
/// against the current environment every call; a per-expression cache
/// suppresses firings when the value hasn't changed since the last check
/// (spec §4.4).
fn watch(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    if !eval.capabilities.has(Capability::DebugEvents) || !eval.tracer.is_enabled() {
        return Ok(Value::Nil);
    }
    for expr_str in args.all_positional() {
        let Value::String(expr_src) = &expr_str else { continue };
        let program = match crate::parser::parse(expr_src, eval.file.clone()) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let Some(crate::ast::Stmt::Expr { expr, .. }) = program.statements.first() else { continue };
        let Ok(value) = eval.eval_expr(expr) else { continue };
        let changed = match eval.watch_cache.get(expr_src.as_ref()) {
            Some(previous) => !previous.equals(&value),
            None => true,
        };
        if changed {
            eval.watch_cache.insert(expr_src.to_string(), value.clone());
            eval.tracer.on_event(&DebugEvent {
                file: eval.file.clone(),
                position: eval.call_position,
                message: String::new(),
                call_stack: eval.call_stack.clone(),
                env: eval.env.clone(),
                watch: Some((expr_src.to_string(), value)),
            });
        }
    }
    Ok(Value::Nil)
}
