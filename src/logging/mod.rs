//! Logging infrastructure - structured tracing of arena lifecycle
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels, filterable per module
//! - Zero-cost when disabled
//! - Console or file output, human-readable or JSON
//!
//! The allocator can be the process global allocator, and a subscriber
//! allocates while formatting. Every event is therefore emitted behind a
//! per-thread guard: an event raised while another is being written on the
//! same thread is dropped instead of recursing.
//!
//! Subscribers also keep thread-local state of their own, which is gone once
//! a thread's destructors start running. A thread emits nothing after it is
//! silenced: when its arena is retired at exit, or when `EXIT_SENTINEL`, torn
//! down ahead of the subscriber state touched by earlier events, is dropped.

use once_cell::sync::OnceCell;
use std::cell::Cell;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub use tracing::{debug, error, info, trace, warn};

use crate::allocator;
use crate::error::AllocError;

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

thread_local! {
    static EMITTING: Cell<bool> = const { Cell::new(false) };
    static SILENCED: Cell<bool> = const { Cell::new(false) };
    static EXIT_SENTINEL: ExitSentinel = const { ExitSentinel };
}

/// Silences the thread when its thread-local storage is torn down
struct ExitSentinel;

impl Drop for ExitSentinel {
    fn drop(&mut self) {
        silence_thread();
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line output
    Compact,
    /// JSON lines for log collectors
    Json,
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Single file, written from a background worker
    File { directory: String, file_name: String },
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Show span events (new/close)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // THREADHEAP_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("THREADHEAP_LOG_LEVEL") {
            config.level = parse_level(&level_str).unwrap_or(Level::INFO);
        }

        // THREADHEAP_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("THREADHEAP_LOG_FILE") {
            let path = std::path::Path::new(&path);
            let directory = path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ".".to_string());
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "threadheap.log".to_string());
            config.output = LogOutput::File { directory, file_name };
        }

        // THREADHEAP_LOG_JSON: enable JSON format
        if std::env::var("THREADHEAP_LOG_JSON").is_ok() {
            config.format = LogFormat::Json;
        }

        // THREADHEAP_LOG_SPANS: show span events
        config.show_spans = std::env::var("THREADHEAP_LOG_SPANS").is_ok();

        config
    }

    /// Verbose lifecycle tracing
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            show_spans: true,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging from the environment
pub fn init() -> Option<WorkerGuard> {
    init_with_config(LogConfig::from_env())
}

/// Initialize logging with custom configuration
///
/// Only the first call installs a subscriber. File output returns a guard
/// that flushes pending lines when dropped; keep it alive until exit.
pub fn init_with_config(config: LogConfig) -> Option<WorkerGuard> {
    let mut guard = None;

    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "threadheap={}",
                config.level.as_str().to_lowercase()
            ))
        });

        let writer = match &config.output {
            LogOutput::Stdout => BoxMakeWriter::new(io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(io::stderr),
            LogOutput::File { directory, file_name } => {
                let appender = tracing_appender::rolling::never(directory, file_name);
                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard = Some(worker);
                BoxMakeWriter::new(writer)
            }
        };

        tracing_subscriber::registry()
            .with(build_layer(&config, writer).with_filter(filter))
            .try_init()
            .ok(); // Another subscriber may already own the process
    });

    guard
}

fn build_layer(
    config: &LogConfig,
    writer: BoxMakeWriter,
) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events_config(config.show_spans))
        .with_target(true)
        .with_thread_ids(true);

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

/// Emit no further events from the calling thread.
pub fn silence_thread() {
    let _ = SILENCED.try_with(|silenced| silenced.set(true));
}

/// Whether the calling thread has been silenced
pub fn is_silenced() -> bool {
    SILENCED.try_with(Cell::get).unwrap_or(true)
}

/// Run `emit` unless this thread is silenced or already inside an event.
#[inline]
fn guarded(emit: impl FnOnce()) {
    if is_silenced() {
        return;
    }
    let _ = EMITTING.try_with(|flag| {
        if flag.replace(true) {
            return;
        }
        emit();
        // First touch registers the sentinel after whatever the subscriber
        // just registered, so it is destroyed first.
        allocator::register_thread_dtor(&EXIT_SENTINEL);
        flag.set(false);
    });
}

// ============================================================================
// Arena lifecycle events
// ============================================================================

/// Log creation of a thread-owned arena
#[inline]
pub fn log_arena_created(arena: *const u8) {
    guarded(|| {
        debug!(event = "arena_created", arena = ?arena, "Private arena created");
    });
}

/// Log destruction of an arena
///
/// `path` is "retire" when the owner found it empty, "last_free" when a
/// later free emptied it.
#[inline]
pub fn log_arena_destroyed(arena: *const u8, path: &'static str) {
    guarded(|| {
        debug!(event = "arena_destroyed", arena = ?arena, path, "Arena destroyed");
    });
}

/// Log a thread front giving up on a private arena
pub fn log_front_shared(reason: &'static str) {
    guarded(|| {
        info!(event = "front_shared", reason, "Thread routed to fallback arena");
    });
}

/// Log a free whose header carries no owning arena
pub fn log_null_owner_free(ptr: *const u8) {
    guarded(|| {
        warn!(
            event = "null_owner_free",
            address = ?ptr,
            "Block has no owning arena, releasing to process heap"
        );
    });
}

/// Log a fatal allocator error
pub fn log_fatal(err: &AllocError) {
    guarded(|| {
        error!(event = "allocator_fatal", error = %err, "Fatal allocator error");
    });
}
