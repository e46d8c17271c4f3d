//! Arena lifecycle counters for monitoring and debugging

use super::fallback;
use std::sync::atomic::{AtomicUsize, Ordering};

static ARENAS_CREATED: AtomicUsize = AtomicUsize::new(0);
static ARENAS_RETIRED: AtomicUsize = AtomicUsize::new(0);
static ARENAS_DESTROYED: AtomicUsize = AtomicUsize::new(0);

/// Snapshot of process-wide arena activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    pub arenas_created: usize,
    pub arenas_retired: usize,
    pub arenas_destroyed: usize,
    /// Blocks currently held from the fallback arena
    pub fallback_outstanding: usize,
}

impl ArenaStats {
    /// Arenas created and not yet destroyed, including retired ones that
    /// still have outstanding blocks
    #[inline]
    pub fn live_arenas(&self) -> usize {
        self.arenas_created.saturating_sub(self.arenas_destroyed)
    }

    /// Retired arenas kept alive by blocks other threads still hold
    #[inline]
    pub fn draining_arenas(&self) -> usize {
        self.arenas_retired.saturating_sub(self.arenas_destroyed)
    }
}

/// Current counters
pub fn stats() -> ArenaStats {
    let arenas_destroyed = ARENAS_DESTROYED.load(Ordering::Acquire);
    let arenas_retired = ARENAS_RETIRED.load(Ordering::Acquire);
    let arenas_created = ARENAS_CREATED.load(Ordering::Acquire);

    ArenaStats {
        arenas_created,
        arenas_retired,
        arenas_destroyed,
        fallback_outstanding: fallback::arena().allocation_count(),
    }
}

#[inline]
pub(crate) fn record_created() {
    ARENAS_CREATED.fetch_add(1, Ordering::Release);
}

#[inline]
pub(crate) fn record_retired() {
    ARENAS_RETIRED.fetch_add(1, Ordering::Release);
}

#[inline]
pub(crate) fn record_destroyed() {
    ARENAS_DESTROYED.fetch_add(1, Ordering::Release);
}
