//! Process-wide coordination datastore (spec §4.7–§4.8): namespaced KV
//! registries with atomic compound operations, condition-variable waits,
//! lazy TTL eviction, and JSON persistence.
//!
//! Grounded on `ouros::modules::queue_mod` for the general shape of a
//! host-exposed object whose fields are method callables over shared
//! mutable state, adapted from single-threaded ouros heap cells to a
//! `Mutex`/`Condvar`-guarded store since `parallel` gives this evaluator
//! real concurrent callers.

mod persist;
mod registry;
mod store;
mod wait;

pub use registry::{Registry, StoreConfig, SYS_NAMESPACE};
pub use store::Store;

use std::fmt;

/// Internal failure shape for a single datastore operation. Converted to a
/// [`crate::error::RuntimeError`] or [`crate::error::WaitTimeout`] at the
/// builtin boundary (`crate::builtins::coordination`), which has access to
/// the calling evaluator's file/position/call-stack.
#[derive(Debug, Clone)]
pub(crate) enum StoreError {
    ReadOnly,
    TypeMismatch(String),
    NotFound(String),
    AlreadyExists(String),
    BadArgument(String),
    Io(String),
    Timeout { key: String, timeout_secs: f64 },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "the 'sys' namespace is read-only"),
            Self::TypeMismatch(m) | Self::BadArgument(m) | Self::Io(m) => write!(f, "{m}"),
            Self::NotFound(k) => write!(f, "key '{k}' not found"),
            Self::AlreadyExists(k) => write!(f, "key '{k}' already exists"),
            Self::Timeout { key, timeout_secs } => write!(f, "wait on '{key}' timed out after {timeout_secs}s"),
        }
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;
