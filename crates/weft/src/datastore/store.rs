//! A single namespaced key-value store: the guarded data plus the one
//! condition variable every mutating method broadcasts on (spec §4.8).

use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use super::wait::wait_with_timeout;
use super::{StoreError, StoreResult};
use crate::value::Value;

#[derive(Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

struct Inner {
    entries: IndexMap<String, Entry>,
}

impl Inner {
    /// Evicts `key` if its TTL has elapsed, returning whether it's present
    /// after the check.
    fn evict_if_expired(&mut self, key: &str) -> bool {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at.is_some_and(|at| Instant::now() >= at) {
                self.entries.shift_remove(key);
                return false;
            }
            true
        } else {
            false
        }
    }
}

/// One `datastore(ns)` instance. `sys` namespaces set `read_only` and
/// never accept a persist config (spec §4.7).
pub struct Store {
    namespace: String,
    read_only: bool,
    persist_path: Option<PathBuf>,
    inner: Mutex<Inner>,
    condvar: Condvar,
    /// Serializes `save`/`load` independent of the data lock (spec §5,
    /// "a separate file-write lock serializes save/load").
    file_lock: Mutex<()>,
}

impl Store {
    pub(crate) fn new(namespace: String, read_only: bool, persist_path: Option<PathBuf>) -> Arc<Self> {
        let store = Arc::new(Self {
            namespace,
            read_only,
            persist_path,
            inner: Mutex::new(Inner { entries: IndexMap::new() }),
            condvar: Condvar::new(),
            file_lock: Mutex::new(()),
        });
        if let Some(path) = &store.persist_path {
            if path.exists() {
                let _ = store.load();
            }
        }
        store
    }

    fn require_writable(&self) -> StoreResult<()> {
        if self.read_only {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }

    pub fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(key.to_string(), Entry { value: value.deep_copy(), expires_at: None });
        self.condvar.notify_all();
        Ok(())
    }

    pub fn set_once(&self, key: &str, value: Value) -> StoreResult<bool> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        if inner.evict_if_expired(key) {
            return Ok(false);
        }
        inner.entries.insert(key.to_string(), Entry { value: value.deep_copy(), expires_at: None });
        self.condvar.notify_all();
        Ok(true)
    }

    pub fn get(&self, key: &str) -> StoreResult<Value> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.evict_if_expired(key) {
            return Ok(Value::Nil);
        }
        Ok(inner.entries.get(key).map(|e| e.value.deep_copy()).unwrap_or(Value::Nil))
    }

    pub fn increment(&self, key: &str, delta: f64) -> StoreResult<Value> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        inner.evict_if_expired(key);
        let current = match inner.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Number(n) => *n,
                _ => return Err(StoreError::TypeMismatch(format!("'{key}' is not a number"))),
            },
            None => 0.0,
        };
        let updated = current + delta;
        inner.entries.insert(key.to_string(), Entry { value: Value::Number(updated), expires_at: None });
        self.condvar.notify_all();
        Ok(Value::Number(updated))
    }

    pub fn push(&self, key: &str, item: Value) -> StoreResult<Value> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        inner.evict_if_expired(key);
        let len = match inner.entries.get_mut(key) {
            Some(entry) => match &entry.value {
                Value::Array(items) => {
                    let mut items = items.lock().unwrap();
                    items.push(item.deep_copy());
                    items.len()
                }
                _ => return Err(StoreError::TypeMismatch(format!("'{key}' is not an array"))),
            },
            None => {
                inner.entries.insert(key.to_string(), Entry { value: Value::array(vec![item.deep_copy()]), expires_at: None });
                1
            }
        };
        self.condvar.notify_all();
        Ok(Value::Number(len as f64))
    }

    fn pop_from_end(&self, key: &str, front: bool) -> StoreResult<Value> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        inner.evict_if_expired(key);
        let result = match inner.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Array(items) => {
                    let mut items = items.lock().unwrap();
                    if items.is_empty() {
                        Value::Nil
                    } else if front {
                        items.remove(0)
                    } else {
                        items.pop().unwrap()
                    }
                }
                _ => return Err(StoreError::TypeMismatch(format!("'{key}' is not an array"))),
            },
            None => Value::Nil,
        };
        self.condvar.notify_all();
        Ok(result)
    }

    pub fn pop(&self, key: &str) -> StoreResult<Value> {
        self.pop_from_end(key, false)
    }

    pub fn shift(&self, key: &str) -> StoreResult<Value> {
        self.pop_from_end(key, true)
    }

    pub fn unshift(&self, key: &str, item: Value) -> StoreResult<Value> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        inner.evict_if_expired(key);
        let len = match inner.entries.get_mut(key) {
            Some(entry) => match &entry.value {
                Value::Array(items) => {
                    let mut items = items.lock().unwrap();
                    items.insert(0, item.deep_copy());
                    items.len()
                }
                _ => return Err(StoreError::TypeMismatch(format!("'{key}' is not an array"))),
            },
            None => {
                inner.entries.insert(key.to_string(), Entry { value: Value::array(vec![item.deep_copy()]), expires_at: None });
                1
            }
        };
        self.condvar.notify_all();
        Ok(Value::Number(len as f64))
    }

    pub fn swap(&self, key: &str, value: Value) -> StoreResult<Value> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        let previous = if inner.evict_if_expired(key) {
            inner.entries.get(key).map(|e| e.value.deep_copy()).unwrap_or(Value::Nil)
        } else {
            Value::Nil
        };
        inner.entries.insert(key.to_string(), Entry { value: value.deep_copy(), expires_at: None });
        self.condvar.notify_all();
        Ok(previous)
    }

    pub fn delete(&self, key: &str) -> StoreResult<()> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        inner.entries.shift_remove(key);
        self.condvar.notify_all();
        Ok(())
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        self.condvar.notify_all();
        Ok(())
    }

    pub fn exists(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.evict_if_expired(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut inner = self.inner.lock().unwrap();
        let all: Vec<String> = inner.entries.keys().cloned().collect();
        all.into_iter().filter(|k| inner.evict_if_expired(k)).collect()
    }

    pub fn rename(&self, old: &str, new: &str) -> StoreResult<()> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.evict_if_expired(old) {
            return Err(StoreError::NotFound(old.to_string()));
        }
        if inner.evict_if_expired(new) {
            return Err(StoreError::AlreadyExists(new.to_string()));
        }
        let entry = inner.entries.shift_remove(old).expect("checked present above");
        inner.entries.insert(new.to_string(), entry);
        self.condvar.notify_all();
        Ok(())
    }

    pub fn expire(&self, key: &str, secs: f64) -> StoreResult<()> {
        self.require_writable()?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.evict_if_expired(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let entry = inner.entries.get_mut(key).expect("checked present above");
        entry.expires_at = Some(Instant::now() + Duration::from_secs_f64(secs.max(0.0)));
        Ok(())
    }

    /// Blocks until `key`'s value differs from `baseline` (no `expected`),
    /// or equals `expected` structurally, or `timeout` elapses (spec §4.8).
    pub fn wait(&self, key: &str, expected: Option<Value>, timeout: Option<f64>) -> StoreResult<Value> {
        let baseline = self.get(key)?;
        wait_with_timeout(&self.inner, &self.condvar, timeout, key, |guard| {
            let current = current_value_locked_evicting(&mut **guard, key);
            match &expected {
                Some(expected) => current.as_ref().is_some_and(|c| c.structurally_equals(expected)).then(|| current.clone().unwrap_or(Value::Nil)),
                None => (!current.as_ref().is_some_and(|c| c.structurally_equals(&baseline))).then(|| current.unwrap_or(Value::Nil)),
            }
        })
    }

    /// Blocks until `predicate(current_value)` (called back through
    /// `invoke`, a script callback) is truthy, or `timeout` elapses (spec
    /// §4.8). The store lock is released before every `invoke` call and
    /// reacquired after, since the callback may run arbitrary script code
    /// that could otherwise re-enter this same store and deadlock.
    pub fn wait_for(&self, key: &str, timeout: Option<f64>, mut invoke: impl FnMut(Value) -> StoreResult<bool>) -> StoreResult<Value> {
        let deadline = timeout.map(|secs| Instant::now() + Duration::from_secs_f64(secs.max(0.0)));
        let check_once = |invoke: &mut dyn FnMut(Value) -> StoreResult<bool>| -> StoreResult<Option<Value>> {
            let current = {
                let mut guard = self.inner.lock().unwrap();
                current_value_locked_evicting(&mut guard, key)
            };
            let Some(current) = current else { return Ok(None) };
            let predicate_arg = match &current {
                Value::Array(items) => Value::Number(items.lock().unwrap().len() as f64),
                other => other.clone(),
            };
            Ok(invoke(predicate_arg)?.then_some(current))
        };

        loop {
            if let Some(value) = check_once(&mut invoke)? {
                return Ok(value);
            }
            let guard = self.inner.lock().unwrap();
            let poll_duration = match deadline {
                None => super::wait::POLL_INTERVAL,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(StoreError::Timeout { key: key.to_string(), timeout_secs: timeout.unwrap_or(0.0) });
                    }
                    remaining.min(super::wait::POLL_INTERVAL)
                }
            };
            let (_guard, result) = self.condvar.wait_timeout(guard, poll_duration).unwrap();
            if result.timed_out() && deadline.is_some_and(|d| Instant::now() >= d) {
                return match check_once(&mut invoke)? {
                    Some(value) => Ok(value),
                    None => Err(StoreError::Timeout { key: key.to_string(), timeout_secs: timeout.unwrap_or(0.0) }),
                };
            }
        }
    }

    pub fn save(&self) -> StoreResult<()> {
        let path = self.persist_path.as_ref().ok_or_else(|| StoreError::BadArgument("no persist path configured".to_string()))?;
        let _file_guard = self.file_lock.lock().unwrap();
        let snapshot: IndexMap<String, Value> = {
            let inner = self.inner.lock().unwrap();
            inner.entries.iter().map(|(k, e)| (k.clone(), e.value.deep_copy())).collect()
        };
        super::persist::save(path, &snapshot).map_err(|e| StoreError::Io(e.to_string()))
    }

    pub fn load(&self) -> StoreResult<()> {
        let path = self.persist_path.as_ref().ok_or_else(|| StoreError::BadArgument("no persist path configured".to_string()))?;
        let _file_guard = self.file_lock.lock().unwrap();
        let loaded = super::persist::load(path).map_err(|e| StoreError::Io(e.to_string()))?;
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        for (k, v) in loaded {
            inner.entries.insert(k, Entry { value: v, expires_at: None });
        }
        self.condvar.notify_all();
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Reads the current value of `key` under an already-held lock, evicting
/// it first if expired; returns `None` if absent (for `wait`) wrapped
/// differently depending on call site, so this returns `Option<Value>`
/// rather than the store's usual `nil`-for-absent convention.
fn current_value_locked_evicting(inner: &mut Inner, key: &str) -> Option<Value> {
    if inner.evict_if_expired(key) {
        inner.entries.get(key).map(|e| e.value.deep_copy())
    } else {
        None
    }
}
