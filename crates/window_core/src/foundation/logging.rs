//! Logging utilities and structured logging support
//!
//! Diagnostics that used to hang off global debug switches are plain `log`
//! records under per-subsystem targets, filtered through `RUST_LOG`:
//!
//! - `window_core::window` lifecycle, geometry and focus changes
//! - `window_core::reparent` reparent decisions and executors
//! - `window_core::mouse` / `window_core::key` input normalization
//! - `window_core::edt` scheduler activity

pub use log::{debug, error, info, trace, warn};

/// Log target for window lifecycle diagnostics
pub const TARGET_WINDOW: &str = "window_core::window";
/// Log target for reparenting diagnostics
pub const TARGET_REPARENT: &str = "window_core::reparent";
/// Log target for mouse input diagnostics
pub const TARGET_MOUSE: &str = "window_core::mouse";
/// Log target for key input diagnostics
pub const TARGET_KEY: &str = "window_core::key";
/// Log target for scheduler diagnostics
pub const TARGET_EDT: &str = "window_core::edt";

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a default filter
///
/// `RUST_LOG` still takes precedence when set. Safe to call more than once;
/// later calls are ignored.
pub fn init_with_level(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}
