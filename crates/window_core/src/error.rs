//! Native window operation errors

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by window, surface and scheduler operations
///
/// Soft failures (convergence timeouts without fail-fast, native creation
/// failure, native close failure) are never reported through this type; they
/// are logged and surface as return values the caller has to check.
#[derive(Error, Debug)]
pub enum WindowError {
    /// A parent window's surface could not be locked
    #[error("Parent surface lock not ready: {0}")]
    ParentNotReady(String),

    /// A caller supplied an out-of-range or unsupported argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant was violated
    #[error("Internal error: {0}")]
    Internal(String),

    /// A fail-fast convergence wait timed out
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Lock misuse, e.g. unlocking a lock the current thread does not own
    #[error("Lock error: {0}")]
    Lock(String),

    /// No driver factory is registered under the requested platform key
    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    /// A platform driver failed to initialize
    #[error("Driver error: {0}")]
    Driver(String),

    /// The serialization thread could not be started or went away
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias for window operations
pub type WindowResult<T> = Result<T, WindowError>;
