use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Global flag to control verbose device enumeration logging
pub static DEVICE_DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Set device debug logging on/off
pub fn set_device_debug(enabled: bool) {
    DEVICE_DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
    info!(
        "🔧 Device debug logging {}",
        if enabled { "ENABLED" } else { "DISABLED" }
    );
}

/// Check if device debug logging is enabled
pub fn is_device_debug_enabled() -> bool {
    DEVICE_DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Install a fmt subscriber for the process.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` when a
/// global subscriber was already installed, which is not treated as an error.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Device debug macro - only logs if device debug is enabled
#[macro_export]
macro_rules! device_debug {
    ($($arg:tt)*) => {
        if $crate::log::DEVICE_DEBUG_ENABLED.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::debug!($($arg)*);
        }
    };
}
