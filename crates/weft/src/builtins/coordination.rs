//! `datastore(ns [, cfg])` (spec §4.7–§4.8): the sole entry point into the
//! process-wide coordination store. Returns an object whose fields are
//! the store's methods, matching [`crate::engine::Engine::register_object`].

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;

use super::define_host;
use crate::capability::Capability;
use crate::datastore::{Registry, Store, StoreConfig, StoreError, SYS_NAMESPACE};
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind, ScriptError, Unwind, WaitTimeout};
use crate::eval::Evaluator;
use crate::function::{ArgMap, HostFn, HostFunction, FunctionValue};
use crate::value::Value;

pub(super) fn install(env: &EnvHandle) {
    define_host(env, "datastore", Arc::new(datastore));
}

fn datastore(eval: &mut Evaluator, args: &ArgMap) -> EvalResult<Value> {
    let Some(Value::String(namespace)) = args.pos(0) else {
        return Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "datastore() expects a namespace string", eval.call_position));
    };
    let config = parse_config(args.pos(1));
    if config.persist.is_some() {
        eval.capabilities.require(Capability::FileRead, &eval.file, eval.call_position)?;
        eval.capabilities.require(Capability::FileWrite, &eval.file, eval.call_position)?;
    }
    let store = eval
        .datastores
        .get_or_create(namespace, config)
        .map_err(|e| store_error_to_unwind(eval, namespace, "<init>", e))?;
    Ok(build_instance(eval.datastores.clone(), store))
}

fn parse_config(cfg: Option<&Value>) -> StoreConfig {
    let mut config = StoreConfig::default();
    let Some(Value::Object(fields)) = cfg else { return config };
    let fields = fields.lock().unwrap();
    if let Some(Value::String(path)) = fields.get("persist") {
        config.persist = Some(PathBuf::from(path.as_ref()));
    }
    if let Some(Value::Number(secs)) = fields.get("persist_interval") {
        config.persist_interval = Some(*secs);
    }
    config
}

fn store_error_to_unwind(eval: &Evaluator, namespace: &str, method: &str, err: StoreError) -> Unwind {
    if let StoreError::Timeout { key, timeout_secs } = &err {
        return Unwind::Error(ScriptError::WaitTimeout(WaitTimeout {
            namespace: namespace.to_string(),
            key: key.clone(),
            timeout_secs: *timeout_secs,
        }));
    }
    let kind = match &err {
        StoreError::ReadOnly => RuntimeErrorKind::PermissionDenied,
        StoreError::TypeMismatch(_) => RuntimeErrorKind::TypeMismatch,
        StoreError::NotFound(_) | StoreError::AlreadyExists(_) | StoreError::BadArgument(_) => RuntimeErrorKind::BadArgument,
        StoreError::Io(_) => RuntimeErrorKind::HostFailure,
        StoreError::Timeout { .. } => unreachable!("handled above"),
    };
    eval.runtime_error(kind, format!("datastore('{namespace}').{method}: {err}"), eval.call_position)
}

/// Builds the method-object returned by `datastore(ns)`. Every closure
/// captures the `Arc<Store>` (and, for `sys`, the registry for its
/// host-provided metrics) rather than a namespace string, so instances
/// keep working even if the namespace is later renamed at the registry
/// level (it can't be, but the closure shape makes that a non-question).
fn build_instance(registry: Arc<Registry>, store: Arc<Store>) -> Value {
    let mut fields = IndexMap::new();
    let is_sys = store.namespace() == SYS_NAMESPACE;

    method(&mut fields, "set", &store, |store, eval, args| {
        let (key, value) = key_and_value(eval, args)?;
        store.set(&key, value).map_err(|e| store_error_to_unwind(eval, store.namespace(), "set", e))?;
        Ok(Value::Nil)
    });
    method(&mut fields, "set_once", &store, |store, eval, args| {
        let (key, value) = key_and_value(eval, args)?;
        let created = store.set_once(&key, value).map_err(|e| store_error_to_unwind(eval, store.namespace(), "set_once", e))?;
        Ok(Value::Bool(created))
    });
    if is_sys {
        let registry = registry.clone();
        let f: HostFn = Arc::new(move |eval, args| {
            let key = string_arg(eval, args, 0, "get")?;
            Ok(registry.sys_metric(&key))
        });
        fields.insert("get".to_string(), Value::Function(Arc::new(FunctionValue::Host(HostFunction { name: "sys.get".to_string(), func: f }))));
    } else {
        method(&mut fields, "get", &store, |store, eval, args| {
            let key = string_arg(eval, args, 0, "get")?;
            store.get(&key).map_err(|e| store_error_to_unwind(eval, store.namespace(), "get", e))
        });
    }
    method(&mut fields, "increment", &store, |store, eval, args| {
        let key = string_arg(eval, args, 0, "increment")?;
        let delta = match args.pos(1) {
            Some(Value::Number(n)) => *n,
            None => 1.0,
            _ => return Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "increment() expects a numeric delta", eval.call_position)),
        };
        store.increment(&key, delta).map_err(|e| store_error_to_unwind(eval, store.namespace(), "increment", e))
    });
    method(&mut fields, "push", &store, |store, eval, args| {
        let (key, value) = key_and_value(eval, args)?;
        store.push(&key, value).map_err(|e| store_error_to_unwind(eval, store.namespace(), "push", e))
    });
    method(&mut fields, "pop", &store, |store, eval, args| {
        let key = string_arg(eval, args, 0, "pop")?;
        store.pop(&key).map_err(|e| store_error_to_unwind(eval, store.namespace(), "pop", e))
    });
    method(&mut fields, "shift", &store, |store, eval, args| {
        let key = string_arg(eval, args, 0, "shift")?;
        store.shift(&key).map_err(|e| store_error_to_unwind(eval, store.namespace(), "shift", e))
    });
    method(&mut fields, "unshift", &store, |store, eval, args| {
        let (key, value) = key_and_value(eval, args)?;
        store.unshift(&key, value).map_err(|e| store_error_to_unwind(eval, store.namespace(), "unshift", e))
    });
    method(&mut fields, "swap", &store, |store, eval, args| {
        let (key, value) = key_and_value(eval, args)?;
        store.swap(&key, value).map_err(|e| store_error_to_unwind(eval, store.namespace(), "swap", e))
    });
    method(&mut fields, "delete", &store, |store, eval, args| {
        let key = string_arg(eval, args, 0, "delete")?;
        store.delete(&key).map_err(|e| store_error_to_unwind(eval, store.namespace(), "delete", e))?;
        Ok(Value::Nil)
    });
    method(&mut fields, "clear", &store, |store, eval, _args| {
        store.clear().map_err(|e| store_error_to_unwind(eval, store.namespace(), "clear", e))?;
        Ok(Value::Nil)
    });
    method(&mut fields, "exists", &store, |store, eval, args| {
        let key = string_arg(eval, args, 0, "exists")?;
        Ok(Value::Bool(store.exists(&key)))
    });
    method(&mut fields, "keys", &store, |store, _eval, _args| Ok(Value::array(store.keys().into_iter().map(Value::string).collect())));
    method(&mut fields, "rename", &store, |store, eval, args| {
        let old = string_arg(eval, args, 0, "rename")?;
        let new = string_arg(eval, args, 1, "rename")?;
        store.rename(&old, &new).map_err(|e| store_error_to_unwind(eval, store.namespace(), "rename", e))?;
        Ok(Value::Nil)
    });
    method(&mut fields, "expire", &store, |store, eval, args| {
        let key = string_arg(eval, args, 0, "expire")?;
        let Some(Value::Number(secs)) = args.pos(1) else {
            return Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "expire() expects seconds", eval.call_position));
        };
        store.expire(&key, *secs).map_err(|e| store_error_to_unwind(eval, store.namespace(), "expire", e))?;
        Ok(Value::Nil)
    });
    method(&mut fields, "wait", &store, |store, eval, args| {
        let key = string_arg(eval, args, 0, "wait")?;
        let expected = args.pos(1).cloned();
        let timeout = timeout_arg(args);
        store.wait(&key, expected, timeout).map_err(|e| store_error_to_unwind(eval, store.namespace(), "wait", e))
    });
    method(&mut fields, "wait_for", &store, |store, eval, args| {
        let key = string_arg(eval, args, 0, "wait_for")?;
        let Some(Value::Function(predicate)) = args.pos(1).cloned() else {
            return Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "wait_for() expects a predicate function", eval.call_position));
        };
        let timeout = timeout_arg(args);
        let position = eval.call_position;
        let result = store.wait_for(&key, timeout, |value| {
            let truthy = eval
                .call_function(predicate.clone(), vec![value], ahash::AHashMap::new(), None, position)
                .map_err(|_| crate::datastore::StoreError::BadArgument("wait_for predicate raised an error".to_string()))?
                .is_truthy();
            Ok(truthy)
        });
        result.map_err(|e| store_error_to_unwind(eval, store.namespace(), "wait_for", e))
    });
    method(&mut fields, "save", &store, |store, eval, _args| {
        eval.capabilities.require(Capability::FileWrite, &eval.file, eval.call_position)?;
        store.save().map_err(|e| store_error_to_unwind(eval, store.namespace(), "save", e))?;
        Ok(Value::Nil)
    });
    method(&mut fields, "load", &store, |store, eval, _args| {
        eval.capabilities.require(Capability::FileRead, &eval.file, eval.call_position)?;
        store.load().map_err(|e| store_error_to_unwind(eval, store.namespace(), "load", e))?;
        Ok(Value::Nil)
    });

    Value::object(fields)
}

fn method(
    fields: &mut IndexMap<String, Value>,
    name: &'static str,
    store: &Arc<Store>,
    f: impl Fn(&Arc<Store>, &mut Evaluator, &ArgMap) -> EvalResult<Value> + Send + Sync + 'static,
) {
    let store = store.clone();
    let func: HostFn = Arc::new(move |eval, args| f(&store, eval, args));
    fields.insert(name.to_string(), Value::Function(Arc::new(FunctionValue::Host(HostFunction { name: format!("datastore.{name}"), func }))));
}

fn string_arg(eval: &Evaluator, args: &ArgMap, index: usize, method: &str) -> EvalResult<String> {
    match args.pos(index) {
        Some(Value::String(s)) => Ok(s.to_string()),
        _ => Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, format!("{method}() expects a string key"), eval.call_position)),
    }
}

fn key_and_value(eval: &Evaluator, args: &ArgMap) -> EvalResult<(String, Value)> {
    let key = string_arg(eval, args, 0, "datastore method")?;
    let value = args.pos(1).cloned().unwrap_or(Value::Nil);
    Ok((key, value))
}

/// `wait`/`wait_for` both take `timeout` as their third positional
/// argument, or as a `timeout=` keyword argument when called without the
/// middle (`expected`/`predicate`) argument in positional form.
fn timeout_arg(args: &ArgMap) -> Option<f64> {
    match args.pos(2).or_else(|| args.get("timeout")) {
        Some(Value::Number(t)) => Some(*t),
        _ => None,
    }
}
