//! Fallback arena - the process heap as a never-retired arena
//!
//! Serves every allocation made while a thread has no private arena:
//! before its front binds one, while binding, after thread-local teardown,
//! or when thread arenas are disabled.

use super::arena::Arena;
use crate::sys::SystemHeap;
use core::ptr::NonNull;

// Constant-initialized, so it exists before the first allocation of the
// process and is never dropped.
static FALLBACK: Arena<SystemHeap> = Arena::fallback(SystemHeap::process());

/// The fallback arena
#[inline]
pub fn arena() -> &'static Arena<SystemHeap> {
    &FALLBACK
}

/// The fallback arena as a header back-pointer
#[inline]
pub fn as_ptr() -> NonNull<Arena<SystemHeap>> {
    NonNull::from(&FALLBACK)
}
