//! Memory allocator - per-thread private heaps with cross-thread free
//!
//! Design: Four layers, leaves first:
//! 1. Arena: one OS heap object, outstanding-block count, retirement flag
//! 2. Fallback arena: the process heap, for threads without an arena
//! 3. Thread front: binds each thread to its own arena, retires it on exit
//! 4. Entry points: stamp every block with its arena so any thread can free it
//!
//! An allocation goes entry point -> front -> arena -> OS heap. A free reads
//! the block header and goes straight to the owning arena, whichever thread
//! calls it.

mod arena;
mod fallback;
mod front;
mod header;
mod stats;


pub use arena::Arena;
pub use front::{with_front, ThreadFront};
pub(crate) use front::register_thread_dtor;
pub use header::{
    align_up, AllocationHeader, OverAlignmentRecord, DEFAULT_ALIGNMENT, HEADER_SIZE, RECORD_SIZE,
};
pub use stats::{stats, ArenaStats};

/// The fallback arena shared by all threads without a private arena
pub use fallback::arena as fallback_arena;

use crate::error::{self, AllocError};
use crate::logging;
use crate::sys::{RawHeap, SystemHeap};
use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};

/// Allocate `size` bytes at the default alignment from the calling
/// thread's arena.
#[inline]
pub fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
    match with_front(|front| front.arena()) {
        Some(arena) => allocate_in(arena, size),
        // Thread-local storage already torn down
        None => allocate_in(fallback::as_ptr(), size),
    }
}

/// Allocate `size` bytes aligned to `align`, a power of two.
///
/// Alignments up to `DEFAULT_ALIGNMENT` take the default path. Larger ones
/// over-allocate and hide the unaligned block pointer in front of the
/// returned address.
pub fn allocate_aligned(size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
    if !align.is_power_of_two() {
        return Err(AllocError::InvalidAlignment { align });
    }
    if align <= DEFAULT_ALIGNMENT {
        return allocate(size);
    }

    let overflow = AllocError::SizeOverflow { size, align };
    let total = align
        .checked_add(size)
        .and_then(|n| n.checked_add(RECORD_SIZE))
        .ok_or(overflow)?;

    let unaligned = allocate(total).map_err(|err| match err {
        AllocError::SizeOverflow { .. } => overflow,
        _ => AllocError::OutOfMemory { size, align },
    })?;

    match unsafe { place_aligned(unaligned, align) } {
        Some(aligned) => Ok(aligned),
        None => {
            unsafe { deallocate(unaligned.as_ptr()) };
            Err(overflow)
        }
    }
}

/// Carve the `align`-aligned block out of `unaligned` and record the
/// unaligned pointer in front of it. None if the address would overflow.
///
/// # Safety
/// `unaligned` must come from `allocate` with room for `align + RECORD_SIZE`
/// bytes beyond the caller's size.
pub(crate) unsafe fn place_aligned(unaligned: NonNull<u8>, align: usize) -> Option<NonNull<u8>> {
    let base = unaligned.as_ptr();
    let aligned = OverAlignmentRecord::aligned_start(base as usize, align)?;

    // Offset keeps the pointer's provenance
    let aligned = base.add(aligned - base as usize);
    OverAlignmentRecord::write(aligned, base);
    Some(NonNull::new_unchecked(aligned))
}

/// Return a default-alignment block to the arena that produced it.
///
/// Null is ignored. A release the OS rejects aborts the process.
///
/// # Safety
/// `ptr` must be null or come from `allocate` (or `allocate_aligned` with an
/// alignment of at most `DEFAULT_ALIGNMENT`) and not have been freed.
#[inline]
pub unsafe fn deallocate(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    if let Err(err) = release(ptr) {
        error::fatal(err);
    }
}

/// Return a block from `allocate_aligned` with the same `align`.
///
/// # Safety
/// `ptr` must be null or come from `allocate_aligned(_, align)` and not have
/// been freed.
#[inline]
pub unsafe fn deallocate_aligned(ptr: *mut u8, align: usize) {
    if ptr.is_null() {
        return;
    }
    if align > DEFAULT_ALIGNMENT {
        deallocate(OverAlignmentRecord::read(ptr));
    } else {
        deallocate(ptr);
    }
}

/// Default-alignment allocation from a specific arena
#[inline]
pub(crate) fn allocate_in(
    arena: NonNull<Arena<SystemHeap>>,
    size: usize,
) -> Result<NonNull<u8>, AllocError> {
    let overalloc = size.checked_add(HEADER_SIZE).ok_or(AllocError::SizeOverflow {
        size,
        align: DEFAULT_ALIGNMENT,
    })?;

    let base = unsafe { arena.as_ref() }
        .allocate(overalloc)
        .ok_or(AllocError::OutOfMemory {
            size,
            align: DEFAULT_ALIGNMENT,
        })?;

    Ok(unsafe { AllocationHeader::write(base, arena.as_ptr()) })
}

/// Route a default-alignment block to its owning arena.
///
/// # Safety
/// `ptr` must be a live block from `allocate_in`.
pub(crate) unsafe fn release(ptr: *mut u8) -> Result<(), AllocError> {
    let base = AllocationHeader::base_of(ptr);

    match NonNull::new(AllocationHeader::arena_of(ptr) as *mut Arena<SystemHeap>) {
        Some(arena) => Arena::free(arena, base),
        None => {
            // No owner recorded: hand the block straight to the process heap.
            logging::log_null_owner_free(ptr);
            if SystemHeap::process().free(base) {
                Ok(())
            } else {
                Err(AllocError::InvalidFree { ptr })
            }
        }
    }
}

/// Global allocator routing every allocation through the calling thread's
/// private arena
///
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: threadheap::ThreadHeap = threadheap::ThreadHeap;
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadHeap;

unsafe impl GlobalAlloc for ThreadHeap {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        match allocate_aligned(layout.size(), layout.align()) {
            Ok(ptr) => ptr.as_ptr(),
            Err(_) => ptr::null_mut(),
        }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        deallocate_aligned(ptr, layout.align());
    }
}
