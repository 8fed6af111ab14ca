//! Process-wide tracing setup shared by the binaries.

/// Initialize process-wide tracing with the format chosen by
/// `STOCKGUARD_LOG_FORMAT` (`json`, the default, or `pretty`).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber configuration (filters, formats).
pub mod tracing;
