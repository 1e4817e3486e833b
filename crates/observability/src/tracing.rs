//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Initialize JSON logging filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// Initialize JSON logging with an explicit filter directive, ignoring `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with_filter(directive: &str) -> bool {
    install(EnvFilter::new(directive))
}

fn install(filter: EnvFilter) -> bool {
    // JSON logs + timestamps; session events carry structured fields.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_a_no_op() {
        init();
        init();
        assert!(!init_with_filter("stockroom_inventory=debug"));
        ::tracing::info!(remaining_seconds = 120, "logging ready");
    }
}
