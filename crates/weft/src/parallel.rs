//! `parallel` (spec §4.5): the one concurrency primitive, spawning real
//! OS threads rather than a cooperative scheduler.
//!
//! Grounded on general Rust idiom (`std::thread::spawn` + `Arc`) rather
//! than on the teacher's own concurrency module — `ouros`'s
//! `threading_mod.rs`/`asyncio.rs` model cooperative green threads backed
//! by its single-threaded VM, which this crate's `Arc<Mutex<_>>`-backed
//! `Value`/`EnvHandle` have no need for and would only obscure. The
//! barrier-join shape (spawn every task, collect every result, swallow
//! per-task failure into `nil`) still follows the teacher's `reduce`-style
//! builtins in spirit: one small dispatcher, no silent partial results.

use std::sync::Arc;
use std::thread;

use indexmap::IndexMap;

use crate::builtins::define_host;
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind};
use crate::eval::Evaluator;
use crate::function::{ArgMap, FunctionValue};
use crate::value::Value;

pub(crate) fn install(env: &EnvHandle) {
    define_host(env, "parallel", Arc::new(parallel));
}

/// One task to run: a closure to invoke with no arguments, plus the slot
/// its result belongs in once every task has finished.
struct Task {
    closure: Arc<FunctionValue>,
}

fn parallel(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    match args.pos(0) {
        Some(Value::Array(items)) => {
            let closures = items.lock().unwrap().clone();
            let tasks = closures.into_iter().enumerate().map(|(i, v)| closure_arg(eval, &v, i)).collect::<EvalResult<Vec<_>>>()?;
            let results = run_tasks(eval, tasks);
            Ok(Value::array(results))
        }
        Some(Value::Object(fields)) => {
            let fields = fields.lock().unwrap().clone();
            let keys: Vec<String> = fields.keys().cloned().collect();
            let tasks = fields.values().enumerate().map(|(i, v)| closure_arg(eval, v, i)).collect::<EvalResult<Vec<_>>>()?;
            let results = run_tasks(eval, tasks);
            let mut out = IndexMap::new();
            for (key, value) in keys.into_iter().zip(results) {
                out.insert(key, value);
            }
            Ok(Value::object(out))
        }
        Some(Value::Function(_)) => {
            let closures = args.all_positional();
            let tasks = closures.iter().enumerate().map(|(i, v)| closure_arg(eval, v, i)).collect::<EvalResult<Vec<_>>>()?;
            let results = run_tasks(eval, tasks);
            Ok(Value::array(results))
        }
        _ => Err(eval.runtime_error(
            RuntimeErrorKind::TypeMismatch,
            "parallel() expects an array of closures, an object of closures, or closures as varargs",
            eval.call_position,
        )),
    }
}

fn closure_arg(eval: &Evaluator, value: &Value, index: usize) -> EvalResult<Task> {
    match value {
        Value::Function(f) => Ok(Task { closure: f.clone() }),
        other => Err(eval.runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!("parallel() task {index} is a {}, not a function", other.type_name()),
            eval.call_position,
        )),
    }
}

/// Spawns one thread per task, each driving its own child [`Evaluator`]
/// marked as running a parallel task (spec §4.6) so every call frame it
/// enters, not only its outermost one, blocks assignment walk-up. A task
/// that errors contributes `nil` rather than aborting its siblings or
/// propagating to the caller (spec §4.5).
fn run_tasks(eval: &Evaluator, tasks: Vec<Task>) -> Vec<Value> {
    let position = eval.call_position;
    let handles: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            let mut child = eval.spawn_parallel_task();
            thread::spawn(move || child.call_function(task.closure, Vec::new(), ahash::AHashMap::new(), None, position).unwrap_or(Value::Nil))
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap_or(Value::Nil)).collect()
}
