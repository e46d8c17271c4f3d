//! C ABI - the entry points for programs linking the static library
//!
//! Design: Thin wrappers over the allocator entry points with C error
//! conventions: null on failure, null frees ignored.

use crate::allocator::{self, DEFAULT_ALIGNMENT};
use crate::config::{self, HeapConfig};
use crate::logging::{self, debug};
use core::ffi::c_void;
use core::ptr;

/// Install configuration and logging from the environment (call once at
/// program start, before spawning threads)
#[no_mangle]
pub extern "C" fn threadheap_init() {
    let _ = config::install(HeapConfig::from_env());
    if let Some(guard) = logging::init() {
        // The file writer lives for the rest of the process
        core::mem::forget(guard);
    }
    debug!(config = ?config::current(), "threadheap initialized");
}

/// Allocate `size` bytes at the default alignment. Null on failure.
#[no_mangle]
pub extern "C" fn threadheap_malloc(size: usize) -> *mut c_void {
    allocator::allocate(size).map_or(ptr::null_mut(), |p| p.as_ptr() as *mut c_void)
}

/// Free a block from `threadheap_malloc`, from any thread
///
/// # Safety
/// `ptr` must be null or a live block from `threadheap_malloc`.
#[no_mangle]
pub unsafe extern "C" fn threadheap_free(ptr: *mut c_void) {
    allocator::deallocate(ptr as *mut u8);
}

/// Allocate `size` bytes aligned to `align`. Null on failure or when
/// `align` is not a power of two.
#[no_mangle]
pub extern "C" fn threadheap_aligned_alloc(align: usize, size: usize) -> *mut c_void {
    allocator::allocate_aligned(size, align).map_or(ptr::null_mut(), |p| p.as_ptr() as *mut c_void)
}

/// Free a block from `threadheap_aligned_alloc` with the same alignment
///
/// # Safety
/// `ptr` must be null or a live block from `threadheap_aligned_alloc(align, _)`.
#[no_mangle]
pub unsafe extern "C" fn threadheap_aligned_free(ptr: *mut c_void, align: usize) {
    allocator::deallocate_aligned(ptr as *mut u8, align);
}

/// Alignment `threadheap_malloc` guarantees
#[no_mangle]
pub extern "C" fn threadheap_default_alignment() -> usize {
    DEFAULT_ALIGNMENT
}

/// Arenas currently alive, including retired ones still draining
#[no_mangle]
pub extern "C" fn threadheap_live_arenas() -> usize {
    allocator::stats().live_arenas()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malloc_free_roundtrip() {
        let ptr = threadheap_malloc(100);
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % threadheap_default_alignment(), 0);
        unsafe {
            ptr::write_bytes(ptr as *mut u8, 0x5A, 100);
            threadheap_free(ptr);
        }
    }

    #[test]
    fn free_null_is_ignored() {
        unsafe {
            threadheap_free(ptr::null_mut());
            threadheap_aligned_free(ptr::null_mut(), 4096);
        }
    }

    #[test]
    fn aligned_alloc_rejects_bad_alignment() {
        assert!(threadheap_aligned_alloc(24, 64).is_null());
        assert!(threadheap_aligned_alloc(0, 64).is_null());
    }

    #[test]
    fn aligned_alloc_honours_alignment() {
        let ptr = threadheap_aligned_alloc(4096, 10);
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % 4096, 0);
        unsafe { threadheap_aligned_free(ptr, 4096) };
    }

    #[test]
    fn init_installs_logging_once() {
        threadheap_init();
        threadheap_init();
        assert!(logging::is_initialized());
        assert!(config::current().thread_arenas);
    }

    #[test]
    fn live_arenas_counts_draining_arena() {
        let block = std::thread::spawn(|| threadheap_malloc(64) as usize)
            .join()
            .expect("owner");

        // Owner exited; its arena stays alive for the outstanding block
        assert!(threadheap_live_arenas() >= 1);
        assert!(crate::allocator::stats().draining_arenas() >= 1);
        unsafe { threadheap_free(block as *mut c_void) };
    }

    #[test]
    fn malloc_reports_overflow_as_null() {
        assert!(threadheap_malloc(usize::MAX).is_null());
    }
}
