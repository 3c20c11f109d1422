//! Process-wide namespace → [`Store`] map backing the `datastore(ns, cfg)`
//! builtin (spec §4.7), plus the reserved read-only `sys` namespace.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{Store, StoreError, StoreResult};
use crate::value::Value;

/// Name of the reserved, read-only namespace (spec §4.7).
pub const SYS_NAMESPACE: &str = "sys";

/// Parsed `cfg` argument to `datastore(ns, cfg)`.
#[derive(Default, Clone)]
pub struct StoreConfig {
    pub persist: Option<PathBuf>,
    pub persist_interval: Option<f64>,
}

struct Entry {
    store: Arc<Store>,
    /// Wall-clock deadline for the next periodic flush, if configured.
    next_flush: Option<Instant>,
    flush_interval: Option<Duration>,
}

/// Holds every namespace created by this process, handing back the same
/// [`Store`] instance for repeated `datastore(ns)` calls with that name.
pub struct Registry {
    stores: Mutex<ahash::AHashMap<String, Entry>>,
    started_at: Instant,
}

impl Registry {
    pub fn new() -> Self {
        Self { stores: Mutex::new(ahash::AHashMap::new()), started_at: Instant::now() }
    }

    /// Returns the existing store for `namespace`, or creates one with
    /// `config` (ignored on repeat lookups — only the first call's config
    /// takes effect, matching "returns the existing instance... or
    /// creates a new one").
    pub fn get_or_create(&self, namespace: &str, config: StoreConfig) -> StoreResult<Arc<Store>> {
        if namespace == SYS_NAMESPACE {
            if config.persist.is_some() || config.persist_interval.is_some() {
                return Err(StoreError::BadArgument("the 'sys' namespace rejects any cfg".to_string()));
            }
            return Ok(self.sys_store());
        }
        let mut stores = self.stores.lock().unwrap();
        if let Some(entry) = stores.get(namespace) {
            return Ok(entry.store.clone());
        }
        let store = Store::new(namespace.to_string(), false, config.persist.clone());
        let flush_interval = config.persist_interval.filter(|s| *s > 0.0).map(Duration::from_secs_f64);
        let next_flush = flush_interval.map(|d| Instant::now() + d);
        stores.insert(namespace.to_string(), Entry { store: store.clone(), next_flush, flush_interval });
        Ok(store)
    }

    fn sys_store(&self) -> Arc<Store> {
        let mut stores = self.stores.lock().unwrap();
        if let Some(entry) = stores.get(SYS_NAMESPACE) {
            return entry.store.clone();
        }
        let store = Store::new(SYS_NAMESPACE.to_string(), true, None);
        stores.insert(SYS_NAMESPACE.to_string(), Entry { store: store.clone(), next_flush: None, flush_interval: None });
        store
    }

    /// Host-provided metric for `sys.get(key)` (spec §4.7); unknown keys
    /// return nil rather than erroring.
    pub(crate) fn sys_metric(&self, key: &str) -> Value {
        match key {
            "uptime_seconds" => Value::Number(self.started_at.elapsed().as_secs_f64()),
            "namespace_count" => Value::Number(self.stores.lock().unwrap().len() as f64),
            "now" => Value::Number(std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as f64),
            _ => Value::Nil,
        }
    }

    /// Flushes any store whose `persist_interval` deadline has passed.
    /// Invoked periodically by a background timer owned by the [`Engine`]
    /// (spec §4.7, "a background timer flushes on that cadence").
    ///
    /// [`Engine`]: crate::engine::Engine
    pub fn tick_persist(&self) {
        let mut stores = self.stores.lock().unwrap();
        let now = Instant::now();
        for entry in stores.values_mut() {
            if let (Some(deadline), Some(interval)) = (entry.next_flush, entry.flush_interval) {
                if now >= deadline {
                    let _ = entry.store.save();
                    entry.next_flush = Some(now + interval);
                }
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
