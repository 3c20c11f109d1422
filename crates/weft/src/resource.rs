//! Recursion-depth guard (SPEC_FULL.md §4.9, ambient addition).
//!
//! Grounded on `ouros::resource::{ResourceError, ResourceTracker}`, trimmed
//! to the recursion-depth check: allocation/time/memory tracking in the
//! teacher are sandboxing concerns this spec does not ask for, but an
//! unbounded tree-walk recursing on a malicious or accidental infinite
//! function call is a correctness hazard any embeddable evaluator needs an
//! answer for.

use crate::error::{Position, RuntimeError, RuntimeErrorKind};

const DEFAULT_MAX_DEPTH: usize = 2048;

pub struct RecursionGuard {
    depth: usize,
    max_depth: usize,
}

impl Default for RecursionGuard {
    fn default() -> Self {
        Self { depth: 0, max_depth: DEFAULT_MAX_DEPTH }
    }
}

impl RecursionGuard {
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { depth: 0, max_depth }
    }

    /// Increments the depth counter; fails if the configured ceiling would
    /// be exceeded. Callers decrement via [`RecursionGuard::leave`] in a
    /// `defer`-like pattern (the evaluator calls it from the tail of every
    /// call-dispatch path, including error paths).
    pub fn enter(&mut self, file: &std::sync::Arc<str>, position: Position) -> Result<(), RuntimeError> {
        if self.depth >= self.max_depth {
            return Err(RuntimeError::new(
                RuntimeErrorKind::RecursionLimit,
                format!("maximum call depth of {} exceeded", self.max_depth),
                file.clone(),
                position,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_at_configured_ceiling() {
        let mut guard = RecursionGuard::with_max_depth(2);
        let file: std::sync::Arc<str> = "test".into();
        assert!(guard.enter(&file, Position::default()).is_ok());
        assert!(guard.enter(&file, Position::default()).is_ok());
        assert!(guard.enter(&file, Position::default()).is_err());
    }

    #[test]
    fn leave_allows_reentry() {
        let mut guard = RecursionGuard::with_max_depth(1);
        let file: std::sync::Arc<str> = "test".into();
        guard.enter(&file, Position::default()).unwrap();
        guard.leave();
        assert!(guard.enter(&file, Position::default()).is_ok());
    }
}
