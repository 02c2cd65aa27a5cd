//! Logging utilities

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system.
///
/// Respects `RUST_LOG`; binaries should call this once before anything else.
pub fn init() {
    env_logger::init();
}
