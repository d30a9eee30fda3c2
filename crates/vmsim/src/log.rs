//! Logging facilities.
//!
//! Messages are prefixed with the current simulation time, the level and the name of the component,
//! e.g. `[120.000 DEBUG scheduler] vm #3 placed on host #0`.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

/// Returns the level label padded to a common width and colored.
pub fn level_label(level: log::Level) -> ColoredString {
    let (label, color) = match level {
        log::Level::Error => ("ERROR", Color::Red),
        log::Level::Warn => ("WARN ", Color::Yellow),
        log::Level::Info => ("INFO ", Color::Green),
        log::Level::Debug => ("DEBUG", Color::Blue),
        log::Level::Trace => ("TRACE", Color::Cyan),
    };
    get_colored(label, color)
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:expr, $ctx:expr, $format:expr $(, $arg:expr)* $(,)?) => {
        log::log!(
            target: $ctx.name(),
            $level,
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(),
            $crate::log::level_label($level),
            $ctx.name()
            $(, $arg)*
        )
    };
}

/// Logs a message at the info level.
///
/// The first argument is anything exposing `time()` and `name()`, usually a [`SimulationContext`](crate::SimulationContext).
/// The rest are the format string and its arguments, as in [`format!`].
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($rest:tt)+) => ($crate::__log_at!(log::Level::Info, $ctx, $($rest)+));
}

/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($rest:tt)+) => ($crate::__log_at!(log::Level::Debug, $ctx, $($rest)+));
}

/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($rest:tt)+) => ($crate::__log_at!(log::Level::Trace, $ctx, $($rest)+));
}

/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($rest:tt)+) => ($crate::__log_at!(log::Level::Warn, $ctx, $($rest)+));
}

/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($rest:tt)+) => ($crate::__log_at!(log::Level::Error, $ctx, $($rest)+));
}
