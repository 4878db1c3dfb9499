//! Tracing and logging (shared setup).

/// Initialize process-wide tracing.
///
/// `default_level` applies when `RUST_LOG` is unset or invalid. Safe to call
/// multiple times; subsequent calls become no-ops.
pub fn init(default_level: &str) {
    tracing::init(default_level);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
