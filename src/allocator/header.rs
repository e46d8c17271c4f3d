//! Block metadata - hidden prefixes in front of caller memory
//!
//! Design: Fixed-layout `repr(C)` records at defined offsets. Every block
//! carries an `AllocationHeader` naming its arena; over-aligned blocks carry
//! one more pointer slot leading back to the unaligned block.
//!
//! ```text
//! default:     [AllocationHeader][caller bytes ...]
//!              ^base             ^returned
//!
//! over-aligned: [AllocationHeader][pad][OverAlignmentRecord][caller bytes ...]
//!               ^base             ^unaligned                ^returned (aligned)
//! ```

use super::arena::Arena;
use crate::sys::SystemHeap;
use core::mem::{align_of, size_of};
use core::ptr::{self, NonNull};

/// Alignment every default-alignment request is guaranteed
#[cfg(target_pointer_width = "64")]
pub const DEFAULT_ALIGNMENT: usize = 16;
#[cfg(not(target_pointer_width = "64"))]
pub const DEFAULT_ALIGNMENT: usize = 8;

/// Bytes reserved in front of every block: max(pointer size, default alignment)
pub const HEADER_SIZE: usize = if size_of::<*const u8>() > DEFAULT_ALIGNMENT {
    size_of::<*const u8>()
} else {
    DEFAULT_ALIGNMENT
};

/// Bytes of the over-alignment slot
pub const RECORD_SIZE: usize = size_of::<OverAlignmentRecord>();

/// Back-pointer to the arena that produced a block
///
/// Padded to `HEADER_SIZE` so the caller's memory keeps default alignment.
#[cfg_attr(target_pointer_width = "64", repr(C, align(16)))]
#[cfg_attr(not(target_pointer_width = "64"), repr(C, align(8)))]
pub struct AllocationHeader {
    arena: *const Arena<SystemHeap>,
}

const _: () = assert!(size_of::<AllocationHeader>() == HEADER_SIZE);
const _: () = assert!(align_of::<AllocationHeader>() == DEFAULT_ALIGNMENT);
const _: () = assert!(DEFAULT_ALIGNMENT.is_power_of_two());

impl AllocationHeader {
    /// Stamp the header at `base` and return the caller's pointer.
    ///
    /// # Safety
    /// `base` must be `DEFAULT_ALIGNMENT`-aligned and valid for
    /// `HEADER_SIZE` bytes.
    #[inline]
    pub unsafe fn write(base: NonNull<u8>, arena: *const Arena<SystemHeap>) -> NonNull<u8> {
        ptr::write(base.as_ptr() as *mut Self, Self { arena });
        NonNull::new_unchecked(base.as_ptr().add(HEADER_SIZE))
    }

    /// Start of the block that `user` was carved from
    ///
    /// # Safety
    /// `user` must have been returned by `write`.
    #[inline]
    pub unsafe fn base_of(user: *mut u8) -> *mut u8 {
        user.sub(HEADER_SIZE)
    }

    /// Owning arena of `user`, null if none was recorded
    ///
    /// # Safety
    /// `user` must have been returned by `write`.
    #[inline]
    pub unsafe fn arena_of(user: *mut u8) -> *const Arena<SystemHeap> {
        (*(Self::base_of(user) as *const Self)).arena
    }
}

/// Slot in front of an over-aligned block holding the unaligned pointer
#[repr(C)]
pub struct OverAlignmentRecord {
    unaligned: *mut u8,
}

impl OverAlignmentRecord {
    /// First `align`-multiple inside `unaligned` that leaves room for the
    /// record. Returns None if the address space cannot hold it.
    #[inline]
    pub fn aligned_start(unaligned: usize, align: usize) -> Option<usize> {
        debug_assert!(align.is_power_of_two(), "alignment must be power of 2");
        let min = unaligned.checked_add(RECORD_SIZE)?;
        align_up(min, align)
    }

    /// Place the record before `aligned`.
    ///
    /// # Safety
    /// The `RECORD_SIZE` bytes before `aligned` must lie inside the block
    /// starting at `unaligned`.
    #[inline]
    pub unsafe fn write(aligned: *mut u8, unaligned: *mut u8) {
        ptr::write(Self::slot(aligned), Self { unaligned });
    }

    /// Recover the unaligned block from an aligned pointer.
    ///
    /// # Safety
    /// `aligned` must have been passed to `write`.
    #[inline]
    pub unsafe fn read(aligned: *mut u8) -> *mut u8 {
        ptr::read(Self::slot(aligned)).unaligned
    }

    #[inline]
    unsafe fn slot(aligned: *mut u8) -> *mut Self {
        aligned.sub(RECORD_SIZE) as *mut Self
    }
}

/// Round `addr` up to a multiple of `align`, None on overflow
#[inline(always)]
pub const fn align_up(addr: usize, align: usize) -> Option<usize> {
    let mask = align - 1;
    match addr.checked_add(mask) {
        Some(bumped) => Some(bumped & !mask),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(8, 8), Some(8));
        assert_eq!(align_up(9, 8), Some(16));
        assert_eq!(align_up(usize::MAX, 64), None);
    }

    #[test]
    fn header_size_covers_pointer_and_alignment() {
        assert!(HEADER_SIZE >= size_of::<*const u8>());
        assert!(HEADER_SIZE >= DEFAULT_ALIGNMENT);
        assert_eq!(HEADER_SIZE % DEFAULT_ALIGNMENT, 0);
    }

    #[test]
    fn aligned_start_leaves_room_for_record() {
        // Already aligned base still moves forward a full alignment step
        assert_eq!(OverAlignmentRecord::aligned_start(4096, 64), Some(4096 + 64));
        assert_eq!(OverAlignmentRecord::aligned_start(4096 + 16, 64), Some(4096 + 64));
        assert_eq!(OverAlignmentRecord::aligned_start(4096 + 60, 64), Some(4096 + 128));
    }
}
