//! Windows backend - one `HeapCreate` heap per arena
//!
//! Private heaps are created serialized (no `HEAP_NO_SERIALIZE`) because
//! blocks are routinely freed from threads other than the allocating one.

use super::RawHeap;
use crate::config::HeapConfig;
use core::ptr;
use winapi::shared::minwindef::FALSE;
use winapi::um::heapapi::{GetProcessHeap, HeapAlloc, HeapCreate, HeapDestroy, HeapFree};
use winapi::um::winnt::HANDLE;

/// `MEMORY_ALLOCATION_ALIGNMENT`
#[cfg(target_pointer_width = "64")]
pub const HEAP_ALIGNMENT: usize = 16;
#[cfg(not(target_pointer_width = "64"))]
pub const HEAP_ALIGNMENT: usize = 8;

/// Handle onto a Win32 heap. A null handle means the process heap.
#[derive(Debug)]
pub struct SystemHeap {
    handle: HANDLE,
}

// Serialized Win32 heaps may be used from any thread.
unsafe impl Send for SystemHeap {}
unsafe impl Sync for SystemHeap {}

impl SystemHeap {
    /// The process-wide shared heap (`GetProcessHeap`)
    #[inline]
    pub const fn process() -> Self {
        Self { handle: ptr::null_mut() }
    }

    /// Acquire a private heap for one arena.
    pub fn create(config: &HeapConfig) -> Option<Self> {
        let handle = unsafe { HeapCreate(0, config.initial_size, config.maximum_size) };
        if handle.is_null() {
            None
        } else {
            Some(Self { handle })
        }
    }

    #[inline]
    pub fn is_process_heap(&self) -> bool {
        self.handle.is_null()
    }

    #[inline]
    fn raw(&self) -> HANDLE {
        if self.handle.is_null() {
            unsafe { GetProcessHeap() }
        } else {
            self.handle
        }
    }
}

impl RawHeap for SystemHeap {
    #[inline]
    fn alloc(&self, size: usize) -> *mut u8 {
        unsafe { HeapAlloc(self.raw(), 0, size) as *mut u8 }
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut u8) -> bool {
        HeapFree(self.raw(), 0, ptr as _) != FALSE
    }

    unsafe fn destroy(self) {
        debug_assert!(!self.is_process_heap(), "process heap must never be destroyed");
        if !self.is_process_heap() {
            HeapDestroy(self.handle);
        }
    }
}
