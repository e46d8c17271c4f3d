//! threadheap - per-thread private heaps behind the global allocator
//!
//! Every thread allocates from its own arena backed by an OS heap object,
//! so allocating threads do not contend on one shared heap. Blocks carry a
//! hidden back-pointer to their arena, which lets any thread free them. An
//! arena outlives its thread for as long as any of its blocks is still
//! outstanding, and is destroyed exactly once when both are gone.

pub mod allocator;
pub mod config;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod sys;

// Re-export core types
pub use allocator::{
    allocate, allocate_aligned, deallocate, deallocate_aligned, stats, ArenaStats, ThreadHeap,
};
pub use config::HeapConfig;
pub use error::AllocError;

use tracing_appender::non_blocking::WorkerGuard;

/// Install heap configuration and logging from the environment.
///
/// Call early in `main`. Threads that already bound an arena keep it.
/// Returns the log file writer guard when logging to a file.
pub fn init() -> Option<WorkerGuard> {
    let _ = config::install(HeapConfig::from_env());
    logging::init()
}
