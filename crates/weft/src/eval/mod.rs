//! Tree-walking evaluator (spec §4.3).
//!
//! Grounded on the `ouros::bytecode::vm` module split — one file per
//! concern (`call.rs`, `binary.rs`, `collections.rs`, `exceptions.rs`) —
//! mirrored here as `statements.rs`, `expressions.rs`, `calls.rs`,
//! `templates.rs`, even though this evaluator walks the AST directly
//! rather than dispatching bytecode ops.

mod calls;
mod expressions;
mod statements;
mod templates;

use std::sync::Arc;

use ahash::AHashMap;

use crate::ast::Program;
use crate::capability::CapabilitySet;
use crate::datastore::Registry as DatastoreRegistry;
use crate::engine::Hooks;
use crate::env::EnvHandle;
use crate::error::{EvalResult, Position, RuntimeError, RuntimeErrorKind, StackFrame, Unwind};
use crate::resource::RecursionGuard;
use crate::tracer::EvalTracer;
use crate::value::Value;

/// Owns everything a running script needs: the current scope, the call
/// stack, the host-supplied capabilities/hooks/tracer, and the shared
/// datastore registry. One `Evaluator` is created per top-level `execute`
/// call; `parallel` constructs one child evaluator per spawned task,
/// sharing the same hooks/tracer/datastore registry (spec §4.5).
pub struct Evaluator {
    pub(crate) env: EnvHandle,
    pub(crate) file: Arc<str>,
    pub(crate) call_stack: Vec<StackFrame>,
    pub(crate) recursion: RecursionGuard,
    pub(crate) tracer: Arc<dyn EvalTracer>,
    pub(crate) capabilities: CapabilitySet,
    pub(crate) hooks: Arc<dyn Hooks>,
    pub(crate) datastores: Arc<DatastoreRegistry>,
    pub(crate) watch_cache: AHashMap<String, Value>,
    pub(crate) script_dir: Option<std::path::PathBuf>,
    /// Position of the call currently dispatching into a host function,
    /// so builtins can report errors with a useful location without the
    /// host-function signature itself having to carry one.
    pub(crate) call_position: Position,
    /// Set for the evaluator driving a `parallel` task body (spec §4.6).
    /// Every call frame a task enters — not just its outermost one — must
    /// block assignment walk-up, so [`Evaluator::call_function`] consults
    /// this flag rather than only marking the task's top-level scope.
    pub(crate) in_parallel_task: bool,
}

impl Evaluator {
    #[must_use]
    pub fn new(
        env: EnvHandle,
        file: Arc<str>,
        tracer: Arc<dyn EvalTracer>,
        capabilities: CapabilitySet,
        hooks: Arc<dyn Hooks>,
        datastores: Arc<DatastoreRegistry>,
    ) -> Self {
        Self {
            env,
            file,
            call_stack: Vec::new(),
            recursion: RecursionGuard::default(),
            tracer,
            capabilities,
            hooks,
            datastores,
            watch_cache: AHashMap::new(),
            script_dir: None,
            call_position: Position::default(),
            in_parallel_task: false,
        }
    }

    /// A child evaluator sharing host-level state (hooks, tracer,
    /// datastores, capabilities) but with its own call stack and recursion
    /// counter, rooted at `env`. Used by method-style builtins that must
    /// recurse into script callbacks from a fresh frame. Inherits
    /// `in_parallel_task` from `self` so a callback invoked from within an
    /// already-running task stays isolated.
    #[must_use]
    pub(crate) fn spawn_child(&self, env: EnvHandle) -> Self {
        Self {
            env,
            file: self.file.clone(),
            call_stack: Vec::new(),
            recursion: RecursionGuard::default(),
            tracer: self.tracer.clone(),
            capabilities: self.capabilities,
            hooks: self.hooks.clone(),
            datastores: self.datastores.clone(),
            watch_cache: AHashMap::new(),
            script_dir: self.script_dir.clone(),
            call_position: Position::default(),
            in_parallel_task: self.in_parallel_task,
        }
    }

    /// A child evaluator for one spawned `parallel` task (spec §4.5–§4.6).
    /// Like [`Evaluator::spawn_child`], but also flags every subsequent
    /// call frame the task enters as running inside a parallel context, so
    /// isolation holds however deeply the task's own calls nest.
    #[must_use]
    pub(crate) fn spawn_parallel_task(&self) -> Self {
        let mut child = self.spawn_child(self.env.child_parallel());
        child.in_parallel_task = true;
        child
    }

    pub fn run_program(&mut self, program: &Program) -> Result<(), crate::error::ScriptError> {
        match self.exec_block_in(&program.statements, self.env.clone()) {
            Ok(()) => Ok(()),
            Err(Unwind::Error(e)) => Err(e),
            Err(Unwind::Exit(_) | Unwind::Return(_) | Unwind::Break | Unwind::Continue) => Ok(()),
        }
    }

    pub(crate) fn runtime_error(&self, kind: RuntimeErrorKind, message: impl Into<String>, position: Position) -> Unwind {
        let mut err = RuntimeError::new(kind, message, self.file.clone(), position);
        err.call_stack = self.call_stack.clone();
        err.into()
    }
}
