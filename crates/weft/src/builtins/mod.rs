//! Default builtin surface (spec §4.4).
//!
//! Grounded on `ouros::modules` — one file per stdlib surface
//! (`math.rs`, `json.rs`, `re.rs`, `time_mod.rs`, `random_mod.rs`,
//! `uuid_mod.rs`) — mirrored here with the groupings spec.md §4.4 itself
//! uses (I/O, collections, higher-order, types, strings, math, JSON,
//! utility, date/time, system, debug).

mod collections;
mod debug;
mod higher_order;
mod io;
pub(crate) mod json;
mod math;
mod strings;
mod system;
mod time;
mod types;
mod util;
mod coordination;

use std::sync::Arc;

use crate::env::EnvHandle;
use crate::function::{HostFn, HostFunction, FunctionValue};
use crate::value::Value;

/// Wraps a Rust closure as a callable `Value::Function::Host` and binds it
/// in `env` under `name`.
pub(crate) fn define_host(env: &EnvHandle, name: &str, f: HostFn) {
    env.define(name, Value::Function(Arc::new(FunctionValue::Host(HostFunction { name: name.to_string(), func: f }))));
}

/// Installs every default builtin into the root environment. Called once
/// by [`crate::engine::Engine::new`] before any user script runs; user
/// calls to `register_function`/`register_object` layer on top of these.
pub fn install(env: &EnvHandle) {
    io::install(env);
    collections::install(env);
    higher_order::install(env);
    types::install(env);
    strings::install(env);
    math::install(env);
    json::install(env);
    util::install(env);
    time::install(env);
    system::install(env);
    debug::install(env);
    coordination::install(env);
    crate::parallel::install(env);
}
