//! Generation tokens — the cancellation epoch for one reply attempt.
//!
//! Exactly one token is live per session. Advancing the counter invalidates
//! every token issued before; a synthesis result is honored only if its
//! token is still current when it completes. Tokens never regress, and
//! invalidating old work never blocks new work — there is no preemption,
//! only a cheap comparison at the moment a result lands.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier of one reply attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationToken(u64);

/// Monotonic issuer of generation tokens, cheap to clone and share with
/// spawned synthesis tasks.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    epoch: Arc<AtomicU64>,
}

impl GenerationCounter {
    /// Create a counter whose first live token is epoch zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently live token.
    #[must_use]
    pub fn current(&self) -> GenerationToken {
        GenerationToken(self.epoch.load(Ordering::SeqCst))
    }

    /// Invalidate all previously issued tokens and return the new live one.
    pub fn advance(&self) -> GenerationToken {
        GenerationToken(self.epoch.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `token` is still the live reply attempt.
    #[must_use]
    pub fn is_current(&self, token: GenerationToken) -> bool {
        self.epoch.load(Ordering::SeqCst) == token.0
    }
}
