//! Release-once discipline for handle-owning objects.
//!
//! Every object that wraps an engine handle or a pooled buffer carries a
//! [`CloseFlag`]. Both the explicit `close()` and the `Drop` impl go through
//! [`CloseFlag::begin_close`], so the underlying release runs at most once no
//! matter how many times (or from which thread) close is requested.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::CodecError;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Engine handle exists, nothing submitted yet.
    Created,
    /// At least one encode/decode call has been made.
    Active,
    /// Engine handle released. Terminal.
    Closed,
}

/// Atomic closed flag.
#[derive(Debug, Default)]
pub struct CloseFlag(AtomicBool);

impl CloseFlag {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Claims the right to release.
    ///
    /// Returns true exactly once, for the first caller.
    pub fn begin_close(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// An object owning a foreign resource that must be released exactly once.
pub trait Resource {
    /// Releases the resource. Closing an already closed resource is a no-op.
    fn close(&mut self) -> Result<(), CodecError>;

    /// Returns true once the resource has been released.
    fn is_closed(&self) -> bool;
}
