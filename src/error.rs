//! Allocator error taxonomy
//!
//! Out-of-memory is reported to the caller. Everything else means the
//! heap bookkeeping can no longer be trusted and ends the process.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The OS heap could not satisfy the request.
    OutOfMemory { size: usize, align: usize },
    /// Size, alignment and header arithmetic does not fit in `usize`.
    SizeOverflow { size: usize, align: usize },
    /// Requested alignment is not a power of two.
    InvalidAlignment { align: usize },
    /// The OS rejected a release: double free, corrupted header or foreign pointer.
    InvalidFree { ptr: *const u8 },
    /// An arena was retired twice or used after destruction.
    LifecycleMisuse(&'static str),
}

impl AllocError {
    /// True for every error a caller should treat as "allocation failed".
    #[inline]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. } | Self::SizeOverflow { .. })
    }

    /// True for errors that must never be absorbed.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidFree { .. } | Self::LifecycleMisuse(_))
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { size, align } => {
                write!(f, "out of memory: {} bytes (align {})", size, align)
            }
            Self::SizeOverflow { size, align } => {
                write!(f, "allocation size overflow: {} bytes (align {})", size, align)
            }
            Self::InvalidAlignment { align } => {
                write!(f, "alignment {} is not a power of two", align)
            }
            Self::InvalidFree { ptr } => {
                write!(f, "invalid free of {:p}", ptr)
            }
            Self::LifecycleMisuse(what) => {
                write!(f, "arena lifecycle violation: {}", what)
            }
        }
    }
}

impl std::error::Error for AllocError {}

// Raw pointers are only carried for reporting.
unsafe impl Send for AllocError {}
unsafe impl Sync for AllocError {}

/// Report a fatal allocator condition and abort.
///
/// Unwinding out of an allocator is not an option, and continuing would run
/// on corrupted accounting.
#[cold]
#[inline(never)]
pub fn fatal(err: AllocError) -> ! {
    crate::logging::log_fatal(&err);
    std::process::abort()
}
