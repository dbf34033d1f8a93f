//! The externally owned cloud-enabled switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether remote sync is allowed.
///
/// The session layer owns the value; every coordinator reads it before any
/// network I/O. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CloudFlag(Arc<AtomicBool>);

impl CloudFlag {
    /// Creates a flag with the given initial value.
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    /// Creates an enabled flag.
    pub fn enabled() -> Self {
        Self::new(true)
    }

    /// Creates a disabled flag (pure local mode).
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Returns true if remote sync is allowed.
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Updates the flag, e.g. on sign-in or sign-out.
    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }
}
