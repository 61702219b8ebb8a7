//! Cancellation tokens for directory scans.
//!
//! A scan holds a `CancellationToken`; the host (for example a signal
//! handler) holds a clone and calls `cancel()`. The walker stops scheduling
//! new directories as soon as it observes the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable cancellation flag shared between a scan and its host.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// Creates a token that can be cancelled through any of its clones.
    pub fn new() -> Self {
        Self {
            cancelled: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Creates a token that is never cancelled.
    ///
    /// Useful for tests or scans that should not be interruptible.
    #[inline]
    pub fn noop() -> Self {
        Self { cancelled: None }
    }

    /// Requests cancellation. Has no effect on a noop token.
    pub fn cancel(&self) {
        if let Some(flag) = &self.cancelled {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Checks if this token is still active.
    ///
    /// Returns `Some(())` if still active, `None` if cancelled.
    /// This enables use with the `?` operator for early returns.
    #[inline]
    pub fn is_cancelled(&self) -> Option<()> {
        match &self.cancelled {
            Some(flag) if flag.load(Ordering::Relaxed) => None,
            _ => Some(()),
        }
    }
}
