//! Arena - one OS heap object plus its outstanding-allocation count
//!
//! Design: The arena is a manually reference-counted resource. The owning
//! thread holds it alive until it retires it; every outstanding block holds
//! it alive until freed. Whichever of the two finishes last destroys it,
//! decided under the arena mutex so exactly one caller ever does.
//!
//! Destruction frees the arena's own memory, so `free` and `retire` take
//! `NonNull<Self>` rather than `&self`.

use super::stats;
use crate::error::AllocError;
use crate::logging;
use crate::sys::{RawHeap, SystemHeap, HEAP_ALIGNMENT};
use core::mem::{align_of, size_of};
use core::ptr::{self, NonNull};
use spin::{Mutex, MutexGuard};

/// Counter and retirement flag, only touched under the arena lock
#[derive(Debug)]
struct ArenaState {
    allocation_count: usize,
    retiring: bool,
}

/// Private memory pool backed by one OS heap object
pub struct Arena<H: RawHeap> {
    heap: H,
    state: Mutex<ArenaState>,
    is_fallback: bool,
}

impl<H: RawHeap> Arena<H> {
    /// Process-lifetime arena over a shared heap. Never retired or destroyed.
    pub const fn fallback(heap: H) -> Self {
        Self {
            heap,
            state: Mutex::new(ArenaState {
                allocation_count: 0,
                retiring: false,
            }),
            is_fallback: true,
        }
    }

    /// Wrap a freshly created heap in a heap-allocated arena.
    ///
    /// The control block comes from the process heap, never from the Rust
    /// global allocator. On failure the heap is destroyed again.
    pub fn create(heap: H) -> Option<NonNull<Self>> {
        debug_assert!(align_of::<Self>() <= HEAP_ALIGNMENT);

        let block = SystemHeap::process().alloc(size_of::<Self>()) as *mut Self;
        let Some(block) = NonNull::new(block) else {
            unsafe { heap.destroy() };
            return None;
        };

        unsafe {
            ptr::write(
                block.as_ptr(),
                Self {
                    heap,
                    state: Mutex::new(ArenaState {
                        allocation_count: 0,
                        retiring: false,
                    }),
                    is_fallback: false,
                },
            );
        }

        stats::record_created();
        logging::log_arena_created(block.as_ptr() as *const u8);
        Some(block)
    }

    /// Request `size` bytes from the heap. None if the OS refused.
    #[inline]
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let ptr = NonNull::new(self.heap.alloc(size))?;

        let mut state = self.lock();
        debug_assert!(!state.retiring, "allocation from a retired arena");
        state.allocation_count += 1;

        Some(ptr)
    }

    /// Release `ptr` and destroy the arena if it was the last block of a
    /// retired arena.
    ///
    /// May be called from any thread. A rejected release leaves the count
    /// untouched and is reported as `InvalidFree`.
    ///
    /// # Safety
    /// `this` must be live and `ptr` must come from `allocate` on it. The
    /// arena may be gone when this returns.
    pub unsafe fn free(this: NonNull<Self>, ptr: *mut u8) -> Result<(), AllocError> {
        let arena = this.as_ref();

        if !arena.heap.free(ptr) {
            return Err(AllocError::InvalidFree { ptr });
        }

        // Decrement and decide in one critical section; deciding after the
        // unlock races with `retire`.
        let destroy = {
            let mut state = arena.lock();
            if state.allocation_count == 0 {
                return Err(AllocError::LifecycleMisuse("free with no outstanding allocations"));
            }
            state.allocation_count -= 1;
            state.allocation_count == 0 && state.retiring && !arena.is_fallback
        };

        if destroy {
            Self::destroy(this, "last_free");
        }
        Ok(())
    }

    /// Hand the arena over to its outstanding blocks.
    ///
    /// Destroys it right away when empty; otherwise the free that empties
    /// it does. Called once, by the owning thread on exit.
    ///
    /// # Safety
    /// `this` must be live. The arena may be gone when this returns.
    pub unsafe fn retire(this: NonNull<Self>) -> Result<(), AllocError> {
        let arena = this.as_ref();

        if arena.is_fallback {
            return Err(AllocError::LifecycleMisuse("fallback arena cannot be retired"));
        }

        let outstanding = {
            let mut state = arena.lock();
            if state.retiring {
                return Err(AllocError::LifecycleMisuse("arena retired twice"));
            }
            state.retiring = true;
            state.allocation_count
        };

        // Counted only: retirement runs among thread-local destructors,
        // where no event can be emitted.
        stats::record_retired();

        // Once `retiring` is set only `free` mutates the count, and a zero
        // count means no free can still arrive.
        if outstanding == 0 {
            Self::destroy(this, "retire");
        }
        Ok(())
    }

    /// Outstanding blocks
    #[inline]
    pub fn allocation_count(&self) -> usize {
        self.lock().allocation_count
    }

    #[inline]
    pub fn is_retiring(&self) -> bool {
        self.lock().retiring
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, ArenaState> {
        self.state.lock()
    }

    #[cold]
    unsafe fn destroy(this: NonNull<Self>, path: &'static str) {
        debug_assert!(!this.as_ref().is_fallback, "fallback arena destroyed");

        let Self { heap, state, .. } = ptr::read(this.as_ptr());
        drop(state);
        SystemHeap::process().free(this.as_ptr() as *mut u8);
        heap.destroy();

        stats::record_destroyed();
        logging::log_arena_destroyed(this.as_ptr() as *const u8, path);
    }
}
