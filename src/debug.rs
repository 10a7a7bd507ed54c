use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static RUN_STARTED: OnceLock<Instant> = OnceLock::new();

/// Turn debug output on or off. The first call also starts the clock that
/// debug lines are stamped with.
pub fn set_debug(enabled: bool) {
    RUN_STARTED.get_or_init(Instant::now);
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Prefix of a debug line: time since the run started, so slow pages and
/// liveness checks stand out in the log.
pub fn line_prefix() -> String {
    let elapsed = RUN_STARTED.get().map(Instant::elapsed).unwrap_or_default();
    format_prefix(elapsed)
}

fn format_prefix(elapsed: Duration) -> String {
    format!("[debug +{:>7.3}s]", elapsed.as_secs_f64())
}

/// Print to stdout only when `--debug` was passed.
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            println!("{} {}", $crate::debug::line_prefix(), format_args!($($arg)*));
        }
    };
}

/// Print to stderr only when `--debug` was passed.
#[macro_export]
macro_rules! debug_eprintln {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("{} {}", $crate::debug::line_prefix(), format_args!($($arg)*));
        }
    };
}
