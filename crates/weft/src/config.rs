//! Embedder-facing configuration (SPEC_FULL.md §4.11).
//!
//! Grounded on the datastore config shape spec.md §3.4/§4.7 already
//! specifies (`{persist: <path>, persist_interval: <secs>}`, see
//! [`crate::datastore::StoreConfig`]) and generalized into the same small,
//! plain-struct shape for the engine itself: no external config-file
//! format, just a value the embedder builds in Rust and hands to
//! [`crate::engine::Engine`].

use std::path::PathBuf;

use crate::capability::CapabilitySet;

/// Construction-time settings for an [`crate::engine::Engine`]: the
/// directory relative imports resolve against, the recursion-depth
/// ceiling (SPEC_FULL.md §4.9), and the capability grant. Each field
/// defaults to the same value `Engine::new()` already uses, so a host
/// only needs to set what it wants to change.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub script_dir: Option<PathBuf>,
    pub max_recursion_depth: Option<usize>,
    pub capabilities: CapabilitySet,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { script_dir: None, max_recursion_depth: None, capabilities: CapabilitySet::all() }
    }
}
