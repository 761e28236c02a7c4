//! Logging utilities
//!
//! The crate logs through the `log` facade. Pass-level progress is `trace`,
//! skipped not-ready nodes are `debug`, setup summaries are `info`.

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system (honours `RUST_LOG`)
pub fn init() {
    env_logger::init();
}

/// Initialize logging for tests; safe to call more than once
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
