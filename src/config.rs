//! Heap configuration
//!
//! Configuration is installed once, before or early in the life of the
//! process, and only ever read from the allocation path. Reading must not
//! allocate, so the environment is parsed up front by `from_env`.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `THREADHEAP_INITIAL_SIZE` | Bytes committed when a private heap is created (Windows) | 0 |
//! | `THREADHEAP_MAX_SIZE` | Maximum private heap size, 0 = growable (Windows) | 0 |
//! | `THREADHEAP_THREAD_ARENAS` | Give each thread its own arena ("true"/"false") | true |

use once_cell::sync::OnceCell;
use std::env;

static CONFIG: OnceCell<HeapConfig> = OnceCell::new();
static DEFAULT: HeapConfig = HeapConfig::DEFAULT;

/// Private heap creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapConfig {
    /// Bytes committed up front for each private heap.
    pub initial_size: usize,

    /// Upper bound for a private heap. 0 means the heap grows as needed.
    pub maximum_size: usize,

    /// When false every thread uses the fallback arena.
    pub thread_arenas: bool,
}

impl HeapConfig {
    pub const DEFAULT: Self = Self {
        initial_size: 0,
        maximum_size: 0,
        thread_arenas: true,
    };

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(size) = env_usize("THREADHEAP_INITIAL_SIZE") {
            config.initial_size = size;
        }
        if let Some(size) = env_usize("THREADHEAP_MAX_SIZE") {
            config.maximum_size = size;
        }
        if let Ok(val) = env::var("THREADHEAP_THREAD_ARENAS") {
            config.thread_arenas = parse_bool(&val).unwrap_or(true);
        }

        config
    }

    /// Route everything through the shared fallback arena
    pub fn shared_only() -> Self {
        Self {
            thread_arenas: false,
            ..Self::DEFAULT
        }
    }

    pub fn with_initial_size(mut self, bytes: usize) -> Self {
        self.initial_size = bytes;
        self
    }

    pub fn with_maximum_size(mut self, bytes: usize) -> Self {
        self.maximum_size = bytes;
        self
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Install the process configuration.
///
/// Only the first call takes effect; later calls hand back the rejected
/// config. Arenas created before installation used the defaults.
pub fn install(config: HeapConfig) -> Result<(), HeapConfig> {
    CONFIG.set(config)
}

/// Active configuration. Never allocates.
#[inline]
pub fn current() -> &'static HeapConfig {
    CONFIG.get().unwrap_or(&DEFAULT)
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok()?.trim().parse().ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
