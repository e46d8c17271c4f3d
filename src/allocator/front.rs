//! Thread-local front - binds each thread to its own arena
//!
//! Design: A constant-initialized thread local without a destructor, so
//! touching it never allocates. The arena is bound lazily on the first
//! allocation and retired, never destroyed, when the thread exits.
//!
//! Retirement runs from a second thread local, `EXIT_HOOK`. Registering its
//! destructor may allocate, so it is first touched while the front is
//! `Binding` and those allocations land in the fallback arena. Retirement
//! runs among the thread's destructors and silences logging for the thread
//! first.

use super::arena::Arena;
use super::fallback;
use crate::config;
use crate::error;
use crate::logging;
use crate::sys::SystemHeap;
use core::cell::Cell;
use core::ptr::NonNull;
use std::thread::LocalKey;

thread_local! {
    static FRONT: ThreadFront = const { ThreadFront::new() };
    static EXIT_HOOK: ExitHook = const { ExitHook };
}

/// Run `f` against the calling thread's front.
///
/// None once the front has been torn down during thread exit.
#[inline]
pub fn with_front<R>(f: impl FnOnce(&ThreadFront) -> R) -> Option<R> {
    FRONT.try_with(f).ok()
}

/// Register the destructor of `key` by touching it.
///
/// Allocations made while the platform records the destructor go to the
/// fallback arena, so an unbound front cannot start binding (and register
/// `EXIT_HOOK`) in the middle of it. False if `key` is already torn down.
pub(crate) fn register_thread_dtor<T: 'static>(key: &'static LocalKey<T>) -> bool {
    with_front(|front| {
        let unbound = front.state.get() == FrontState::Unbound;
        if unbound {
            front.state.set(FrontState::Binding);
        }
        let alive = key.try_with(|_| ()).is_ok();
        if unbound {
            front.state.set(FrontState::Unbound);
        }
        alive
    })
    .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrontState {
    /// No arena yet; the next allocation creates one.
    Unbound,
    /// Arena under construction; re-entrant allocations go to the fallback.
    Binding,
    /// Sole owner of a live private arena.
    Bound(NonNull<Arena<SystemHeap>>),
    /// Permanently routed to the fallback arena.
    Shared,
}

/// Per-thread handle owning the thread's private arena
pub struct ThreadFront {
    state: Cell<FrontState>,
}

impl ThreadFront {
    pub const fn new() -> Self {
        Self {
            state: Cell::new(FrontState::Unbound),
        }
    }

    /// A front caught mid-construction
    #[cfg(test)]
    pub(crate) const fn binding() -> Self {
        Self {
            state: Cell::new(FrontState::Binding),
        }
    }

    /// Whether a private arena is bound
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.state.get(), FrontState::Bound(_))
    }

    /// Arena that serves this thread's next allocation
    #[inline]
    pub fn arena(&self) -> NonNull<Arena<SystemHeap>> {
        match self.state.get() {
            FrontState::Bound(arena) => arena,
            FrontState::Unbound => self.bind(),
            FrontState::Binding | FrontState::Shared => fallback::as_ptr(),
        }
    }

    #[cold]
    fn bind(&self) -> NonNull<Arena<SystemHeap>> {
        let config = config::current();
        if !config.thread_arenas {
            self.state.set(FrontState::Shared);
            logging::log_front_shared("thread arenas disabled");
            return fallback::as_ptr();
        }

        self.state.set(FrontState::Binding);
        if logging::is_silenced() || EXIT_HOOK.try_with(|_| ()).is_err() {
            // Thread already exiting: nothing would retire a new arena
            self.state.set(FrontState::Shared);
            return fallback::as_ptr();
        }

        match SystemHeap::create(config).and_then(Arena::create) {
            Some(arena) => {
                self.state.set(FrontState::Bound(arena));
                arena
            }
            None => {
                self.state.set(FrontState::Shared);
                logging::log_front_shared("private heap creation failed");
                fallback::as_ptr()
            }
        }
    }

    /// Give up the private arena. Later allocations use the fallback.
    fn retire(&self) {
        // Other threads may still hold blocks from this arena; retirement
        // lets the last of them destroy it.
        if let FrontState::Bound(arena) = self.state.replace(FrontState::Shared) {
            if let Err(err) = unsafe { Arena::retire(arena) } {
                error::fatal(err);
            }
        }
    }
}

impl Default for ThreadFront {
    fn default() -> Self {
        Self::new()
    }
}

/// Retires the thread's arena when thread-local storage is torn down
struct ExitHook;

impl Drop for ExitHook {
    fn drop(&mut self) {
        // Subscriber thread locals may already be destroyed
        logging::silence_thread();
        with_front(ThreadFront::retire);
    }
}
