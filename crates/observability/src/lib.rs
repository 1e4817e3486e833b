//! Tracing/logging setup shared by whatever hosts an inventory session.
//!
//! The domain crates only emit `tracing` events; nothing is printed unless a
//! host installs a subscriber through [`init`].

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
