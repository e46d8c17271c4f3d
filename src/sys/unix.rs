//! Unix backend - the C heap
//!
//! There is no portable private heap object on Unix. Every arena draws from
//! `malloc`, which already tolerates frees from foreign threads; the arena
//! layer above still does its own accounting and lifecycle.
//!
//! `free` cannot report a rejected release: `free(3)` returns nothing, so
//! `InvalidFree` never arises here and a double free is left to the C heap.

use super::RawHeap;
use crate::config::HeapConfig;

/// `malloc` returns memory aligned for any fundamental type.
pub const HEAP_ALIGNMENT: usize = 2 * core::mem::size_of::<usize>();

/// Handle onto the C heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemHeap {
    private: bool,
}

impl SystemHeap {
    /// The process-wide shared heap
    #[inline]
    pub const fn process() -> Self {
        Self { private: false }
    }

    /// Acquire a heap for one arena. Size hints only apply on Windows.
    pub fn create(_config: &HeapConfig) -> Option<Self> {
        Some(Self { private: true })
    }

    #[inline]
    pub fn is_process_heap(&self) -> bool {
        !self.private
    }
}

impl RawHeap for SystemHeap {
    #[inline]
    fn alloc(&self, size: usize) -> *mut u8 {
        // malloc(0) may legally return null
        unsafe { libc::malloc(size.max(1)) as *mut u8 }
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut u8) -> bool {
        libc::free(ptr as *mut libc::c_void);
        true
    }

    unsafe fn destroy(self) {
        debug_assert!(self.private, "process heap must never be destroyed");
    }
}
