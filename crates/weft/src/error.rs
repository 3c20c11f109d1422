//! Error taxonomy for the language (spec §7).
//!
//! Three kinds of carrier move through the evaluator:
//!
//! - [`ScriptError`] — what crosses the embedder boundary: parse failures,
//!   runtime errors, thrown values, and wait timeouts.
//! - [`Unwind`] — an internal-only enum that also carries `return`/`break`/
//!   `continue`/`exit` control flow up through the tree walk. It never
//!   leaks past [`crate::engine::Engine`].
//!
//! Display is hand-rolled rather than derived (matching the teacher's
//! `exception_private`/`resource` modules, which predate this crate's
//! dependency on `strum` for the closed error-kind enum).

use std::fmt;
use std::sync::Arc;

use strum::Display as StrumDisplay;

use crate::value::Value;

/// A source location: 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One call-stack frame, captured at the call site and popped on return.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function: String,
    pub file: Arc<str>,
    pub position: Position,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  at {} ({}:{})", self.function, self.file, self.position)
    }
}

/// Invalid syntax, with enough context to point at the offending token and,
/// for an unmatched closing bracket, the position of its opener.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub file: Arc<str>,
    pub position: Position,
    pub opener: Option<Position>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParseError: {} ({}:{})", self.message, self.file, self.position)?;
        if let Some(opener) = self.opener {
            write!(f, " (opened at {opener})")?;
        }
        Ok(())
    }
}

/// The general class of failure raised while a script is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum RuntimeErrorKind {
    UndefinedVariable,
    TypeMismatch,
    DivisionByZero,
    IndexOutOfBounds,
    BadArgument,
    NotCallable,
    HostFailure,
    /// Ambient addition (SPEC_FULL.md §4.9): the evaluator's call-depth
    /// guard tripped before the host's native stack would have.
    RecursionLimit,
    /// Ambient addition (SPEC_FULL.md §4.9): a capability-gated builtin was
    /// invoked without the required capability.
    PermissionDenied,
}

#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub file: Arc<str>,
    pub position: Position,
    pub call_stack: Vec<StackFrame>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RuntimeError ({}): {} ({}:{})", self.kind, self.message, self.file, self.position)?;
        for frame in &self.call_stack {
            writeln!(f, "{frame}")?;
        }
        Ok(())
    }
}

impl RuntimeError {
    #[must_use]
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>, file: Arc<str>, position: Position) -> Self {
        Self { kind, message: message.into(), file, position, call_stack: Vec::new() }
    }
}

/// The payload of `throw(v)`, preserved through the unwind as the original
/// [`Value`] rather than a stringified copy (spec §9 design note).
#[derive(Debug, Clone)]
pub struct ThrownValue {
    pub value: Value,
    pub file: Arc<str>,
    pub position: Position,
    pub call_stack: Vec<StackFrame>,
}

impl fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uncaught throw: {} ({}:{})", self.value, self.file, self.position)
    }
}

/// Raised by `wait`/`wait_for` when the bound elapses (spec §4.8).
#[derive(Debug, Clone)]
pub struct WaitTimeout {
    pub namespace: String,
    pub key: String,
    pub timeout_secs: f64,
}

impl fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wait on '{}' in datastore '{}' timed out after {}s", self.key, self.namespace, self.timeout_secs)
    }
}

/// Everything that can cross the embedder boundary (spec §7).
#[derive(Debug, Clone)]
pub enum ScriptError {
    Parse(ParseError),
    Runtime(RuntimeError),
    Thrown(ThrownValue),
    WaitTimeout(WaitTimeout),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
            Self::Thrown(e) => write!(f, "{e}"),
            Self::WaitTimeout(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<ParseError> for ScriptError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

/// Internal unwind carrier. `Return`/`Break`/`Continue`/`Exit` are control-flow,
/// not errors; the evaluator catches each at its boundary (function call,
/// loop body, script top level) and none of them ever reach [`ScriptError`].
pub(crate) enum Unwind {
    Error(ScriptError),
    Return(Value),
    Break,
    Continue,
    /// Carries the deep-copied values passed to `exit(...)`.
    Exit(Vec<Value>),
}

impl From<ScriptError> for Unwind {
    fn from(e: ScriptError) -> Self {
        Self::Error(e)
    }
}

impl From<ParseError> for Unwind {
    fn from(e: ParseError) -> Self {
        Self::Error(ScriptError::Parse(e))
    }
}

impl From<RuntimeError> for Unwind {
    fn from(e: RuntimeError) -> Self {
        Self::Error(ScriptError::Runtime(e))
    }
}

pub(crate) type EvalResult<T> = Result<T, Unwind>;
