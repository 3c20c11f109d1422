//! Debug event sink backing `breakpoint`/`watch` (spec §6, ambient §4.10).
//!
//! Grounded on `ouros::tracer` (`VmTracer` trait plus `NoopTracer`/
//! `StderrTracer`/`RecordingTracer`), trimmed to the two events this
//! evaluator actually raises — there is no opcode or cell-slot trace here,
//! since there is no bytecode.

use std::fmt;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex};

use crate::env::EnvHandle;
use crate::error::{Position, StackFrame};
use crate::value::Value;

/// A single breakpoint or watch-expression firing.
#[derive(Clone)]
pub struct DebugEvent {
    pub file: Arc<str>,
    pub position: Position,
    pub message: String,
    pub call_stack: Vec<StackFrame>,
    /// The environment active at the event site, so a debug REPL can
    /// inspect or `eval_in_environment` against it (spec §6).
    pub env: EnvHandle,
    /// Set only for `watch` firings: the expression source and its
    /// newly-observed value.
    pub watch: Option<(String, Value)>,
}

impl fmt::Debug for DebugEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugEvent")
            .field("file", &self.file)
            .field("position", &self.position)
            .field("message", &self.message)
            .field("watch", &self.watch)
            .finish()
    }
}

/// Sink for debug events. Implementations must be `Send + Sync` since
/// `parallel` tasks may each hit a breakpoint from a different thread.
pub trait EvalTracer: Send + Sync {
    fn on_event(&self, event: &DebugEvent);

    /// Whether debug instrumentation is enabled at all; builtins skip the
    /// (non-trivial) work of building a [`DebugEvent`] when this is false.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Discards every event. The default tracer for a non-debug run.
#[derive(Debug, Default)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {
    fn on_event(&self, _event: &DebugEvent) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Prints each event to stderr. Used by the CLI's `--debug` flag.
#[derive(Debug, Default)]
pub struct StderrTracer;

impl EvalTracer for StderrTracer {
    fn on_event(&self, event: &DebugEvent) {
        match &event.watch {
            Some((expr, value)) => {
                eprintln!("[watch {}:{}] {expr} = {value}", event.file, event.position);
            }
            None => {
                eprintln!("[breakpoint {}:{}] {}", event.file, event.position, event.message);
                for frame in &event.call_stack {
                    eprintln!("{frame}");
                }
            }
        }
    }
}

/// Accumulates every event in memory. Used by tests and by embedders that
/// poll rather than stream.
#[derive(Default)]
pub struct RecordingTracer {
    events: Mutex<Vec<DebugEvent>>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<DebugEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EvalTracer for RecordingTracer {
    fn on_event(&self, event: &DebugEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Streams events to the embedder over a bounded channel (spec §6) and
/// blocks the evaluating thread until the embedder calls
/// [`ChannelTracer::resume`], implementing the "(optionally) resumes"
/// debug-REPL contract. A full channel drops the event rather than
/// blocking the script on a slow consumer.
pub struct ChannelTracer {
    sender: SyncSender<DebugEvent>,
    resume_gate: Arc<(Mutex<u64>, Condvar)>,
}

impl ChannelTracer {
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Receiver<DebugEvent>) {
        let (sender, receiver) = sync_channel(capacity);
        (Self { sender, resume_gate: Arc::new((Mutex::new(0), Condvar::new())) }, receiver)
    }

    /// Wakes every thread currently blocked in [`EvalTracer::on_event`].
    pub fn resume(&self) {
        let (lock, cvar) = &*self.resume_gate;
        *lock.lock().unwrap() += 1;
        cvar.notify_all();
    }
}

impl EvalTracer for ChannelTracer {
    fn on_event(&self, event: &DebugEvent) {
        let seen = match self.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        };
        if !seen {
            return;
        }
        let (lock, cvar) = &*self.resume_gate;
        let guard = lock.lock().unwrap();
        let generation = *guard;
        let _unused = cvar.wait_while(guard, |g| *g == generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> DebugEvent {
        DebugEvent {
            file: "test".into(),
            position: Position::default(),
            message: "hit".to_string(),
            call_stack: vec![],
            env: EnvHandle::root(),
            watch: None,
        }
    }

    #[test]
    fn noop_tracer_reports_disabled() {
        assert!(!NoopTracer.is_enabled());
    }

    #[test]
    fn recording_tracer_accumulates_events() {
        let tracer = RecordingTracer::new();
        tracer.on_event(&sample_event());
        tracer.on_event(&sample_event());
        assert_eq!(tracer.events().len(), 2);
    }
}
