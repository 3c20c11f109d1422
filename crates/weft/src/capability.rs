//! Capability-gated embedder boundary (SPEC_FULL.md §4.9).
//!
//! Grounded on `ouros::capability` almost directly: a closed set of named
//! capabilities, a bitset the embedder configures once at construction, and
//! a `PermissionDenied` error raised at the call site of the gated builtin
//! rather than threaded through every signature.

use std::fmt;

use crate::error::{Position, RuntimeError, RuntimeErrorKind};

/// A single grantable capability. New host-facing builtins that touch the
/// filesystem, network, environment, or process should gate on one of
/// these rather than assuming they're always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    FileRead,
    FileWrite,
    StdinRead,
    StdoutWrite,
    EnvRead,
    ProcessExit,
    DebugEvents,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::StdinRead => "stdin_read",
            Self::StdoutWrite => "stdout_write",
            Self::EnvRead => "env_read",
            Self::ProcessExit => "process_exit",
            Self::DebugEvents => "debug_events",
        };
        f.write_str(s)
    }
}

/// The set of capabilities granted to a running script. Defaults to
/// everything enabled, matching a trusted-script embedding; a sandboxing
/// host narrows this explicitly.
#[derive(Debug, Clone, Copy)]
pub struct CapabilitySet {
    granted: u8,
}

const ALL_CAPS: &[Capability] = &[
    Capability::FileRead,
    Capability::FileWrite,
    Capability::StdinRead,
    Capability::StdoutWrite,
    Capability::EnvRead,
    Capability::ProcessExit,
    Capability::DebugEvents,
];

fn bit(cap: Capability) -> u8 {
    1 << (ALL_CAPS.iter().position(|c| *c == cap).expect("capability in ALL_CAPS"))
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::all()
    }
}

impl CapabilitySet {
    #[must_use]
    pub fn all() -> Self {
        Self { granted: ALL_CAPS.iter().fold(0, |acc, c| acc | bit(*c)) }
    }

    #[must_use]
    pub fn none() -> Self {
        Self { granted: 0 }
    }

    #[must_use]
    pub fn with(mut self, cap: Capability) -> Self {
        self.granted |= bit(cap);
        self
    }

    #[must_use]
    pub fn without(mut self, cap: Capability) -> Self {
        self.granted &= !bit(cap);
        self
    }

    #[must_use]
    pub fn has(&self, cap: Capability) -> bool {
        self.granted & bit(cap) != 0
    }

    /// Fails with a `PermissionDenied` runtime error if `cap` is not
    /// granted. Builtins that touch the outside world call this first.
    pub fn require(
        &self,
        cap: Capability,
        file: &std::sync::Arc<str>,
        position: Position,
    ) -> Result<(), RuntimeError> {
        if self.has(cap) {
            Ok(())
        } else {
            Err(RuntimeError::new(
                RuntimeErrorKind::PermissionDenied,
                format!("capability '{cap}' is not granted to this script"),
                file.clone(),
                position,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grants_everything() {
        let caps = CapabilitySet::default();
        assert!(caps.has(Capability::FileWrite));
    }

    #[test]
    fn without_revokes_a_single_capability() {
        let caps = CapabilitySet::all().without(Capability::FileWrite);
        assert!(!caps.has(Capability::FileWrite));
        assert!(caps.has(Capability::FileRead));
    }

    #[test]
    fn require_fails_when_not_granted() {
        let caps = CapabilitySet::none();
        let file: std::sync::Arc<str> = "test".into();
        assert!(caps.require(Capability::FileWrite, &file, Position::default()).is_err());
    }
}
