//! Process-wide logging setup shared by the server binary and tests.

pub mod tracing;

pub use self::tracing::LogFormat;

/// Install the global subscriber; later calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
