//! Function values: script closures and host-provided callables (spec §3.1,
//! §4.3.3).
//!
//! Grounded on `ouros::function::Function` for the doc-comment shape
//! describing namespace/closure layout, trimmed to what a name-based
//! (rather than slot-indexed) closure actually needs to carry.

use std::fmt;
use std::sync::Arc;

use crate::ast::{Expr, Position, Stmt};
use crate::env::EnvHandle;
use crate::error::EvalResult;
use crate::eval::Evaluator;
use crate::value::Value;

/// A single formal parameter, with an optional default-value expression
/// evaluated in the function's *closure* scope (spec §9 Open Question,
/// resolved: closure scope, not call site).
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Arc<Expr>>,
}

/// A function defined by script source: parameters, body, and the
/// environment captured at definition time.
#[derive(Clone)]
pub struct ScriptFunction {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Arc<Vec<Stmt>>,
    pub closure: EnvHandle,
    pub file: Arc<str>,
    pub position: Position,
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.name)
            .field("params", &self.params.len())
            .field("file", &self.file)
            .finish()
    }
}

/// Arguments passed to a host function: positional arguments keyed by their
/// zero-based index as a decimal string, named arguments keyed by name
/// (spec §4.3.3 point 4). Builtins read through the small accessor surface
/// below rather than poking at the map directly.
#[derive(Debug, Clone, Default)]
pub struct ArgMap {
    values: ahash::AHashMap<String, Value>,
    positional_count: usize,
}

impl ArgMap {
    pub(crate) fn new(positional: Vec<Value>, named: ahash::AHashMap<String, Value>) -> Self {
        let mut values = named;
        let positional_count = positional.len();
        for (i, v) in positional.into_iter().enumerate() {
            values.insert(i.to_string(), v);
        }
        Self { values, positional_count }
    }

    /// Looks up a named argument, or a positional one if `name` happens to
    /// be a decimal index.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The `index`-th positional argument, if present.
    #[must_use]
    pub fn pos(&self, index: usize) -> Option<&Value> {
        self.values.get(&index.to_string())
    }

    /// Number of positional arguments supplied.
    #[must_use]
    pub fn positional_count(&self) -> usize {
        self.positional_count
    }

    /// All positional arguments in order, for varargs-style builtins.
    #[must_use]
    pub fn all_positional(&self) -> Vec<Value> {
        (0..self.positional_count).filter_map(|i| self.pos(i).cloned()).collect()
    }
}

/// The signature every host function implements: given the evaluator (for
/// recursive calls into script callbacks, e.g. `map`/`filter`) and the
/// argument map, produce a value or an unwind (error, or a control-flow
/// signal raised by the builtin itself, e.g. `exit`/`throw`).
pub type HostFn = Arc<dyn Fn(&mut Evaluator, &ArgMap) -> EvalResult<Value> + Send + Sync>;

#[derive(Clone)]
pub struct HostFunction {
    pub name: String,
    pub func: HostFn,
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction").field("name", &self.name).finish()
    }
}

/// A callable value: either a script closure or an opaque host callable
/// (spec §3.1).
#[derive(Debug, Clone)]
pub enum FunctionValue {
    Script(ScriptFunction),
    Host(HostFunction),
}

impl FunctionValue {
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Script(f) => f.name.as_deref().unwrap_or("<anonymous>"),
            Self::Host(f) => &f.name,
        }
    }
}
