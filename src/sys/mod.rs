//! OS heap primitive - one heap object with create/alloc/free/destroy
//!
//! Design: The arena layer only needs "anyone may allocate, any thread may
//! free" from the platform. Each backend exposes exactly that and nothing
//! more; size classes and free lists stay inside the OS heap.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{SystemHeap, HEAP_ALIGNMENT};
#[cfg(windows)]
pub use windows::{SystemHeap, HEAP_ALIGNMENT};

use crate::allocator::DEFAULT_ALIGNMENT;

// Default-alignment requests return `base + HEADER_SIZE`, so the base itself
// must already satisfy the default alignment.
const _: () = assert!(
    HEAP_ALIGNMENT >= DEFAULT_ALIGNMENT,
    "OS heap cannot guarantee the default allocation alignment"
);

/// A single OS-level heap object
///
/// Implementations must be safe to allocate from on one thread and free
/// into from any other.
pub trait RawHeap: Send + Sync + Sized {
    /// Request `size` bytes. Returns null on failure, never panics.
    fn alloc(&self, size: usize) -> *mut u8;

    /// Release a block obtained from `alloc` on this heap.
    ///
    /// Returns false if the OS rejected the release.
    ///
    /// # Safety
    /// `ptr` must have been returned by `alloc` on this heap and not yet freed.
    unsafe fn free(&self, ptr: *mut u8) -> bool;

    /// Tear the heap object down.
    ///
    /// # Safety
    /// No block from this heap may still be in use.
    unsafe fn destroy(self);
}
