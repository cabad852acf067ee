//! Logging setup for filtrate.
//!
//! Output is structured JSON by default and is controlled by environment
//! variables.
//!
//! # Environment Variables
//!
//! - `FILTRATE_DEBUG=true|1|yes` - Enable debug logging
//! - `FILTRATE_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `FILTRATE_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use filtrate_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//!
//! // Or with custom settings
//! logging::init_with_level("debug");
//! ```
//!
//! # What is logged
//!
//! - `debug`: parse entry and exit, rejected fields and modifiers
//! - `trace`: every field, modifier and interceptor invocation
//! - `warn`: modifiers configured with an unusable definition

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `FILTRATE_DEBUG`.
///
/// Returns `true` if `FILTRATE_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("FILTRATE_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `FILTRATE_LOG_LEVEL`.
///
/// Defaults to "debug" if `FILTRATE_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("FILTRATE_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `FILTRATE_LOG_FORMAT`.
///
/// Defaults to "json".
pub fn get_log_format() -> &'static str {
    env::var("FILTRATE_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize logging.
///
/// Call once at startup; later calls are no-ops. Nothing is installed unless
/// `FILTRATE_DEBUG` or `FILTRATE_LOG_LEVEL` is set. Without the
/// `tracing-subscriber` feature this only records that initialization
/// happened, and events go to whatever subscriber the application installs.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("FILTRATE_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "filtrate={},filtrate_query={},filtrate_axum={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "filtrate logging initialized"
                );
            }
        }
    });
}

/// Initialize logging with a specific level.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call this early in your program before
/// spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: only meant to be called at startup, before threads are spawned.
    unsafe {
        env::set_var("FILTRATE_LOG_LEVEL", level);
    }
    init();
}

/// Debug event emitted only when `FILTRATE_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! filtrate_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            ::tracing::debug!($($arg)*);
        }
    };
}

/// Trace event emitted only when `FILTRATE_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! filtrate_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            ::tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_defaults() {
        // SAFETY: Test runs in isolation
        unsafe {
            env::remove_var("FILTRATE_DEBUG");
            env::remove_var("FILTRATE_LOG_LEVEL");
            env::remove_var("FILTRATE_LOG_FORMAT");
        }
        assert!(!is_debug_enabled());
        assert_eq!(get_log_level(), "warn");
        assert_eq!(get_log_format(), "json");
    }
}
