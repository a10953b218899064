//! Error types for monitor operations

use std::io;
use thiserror::Error;

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while configuring or running the monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Syscall error: {0}")]
    Syscall(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No process matching PID {0} can be found")]
    TargetNotFound(i32),

    #[error("More than one process named '{0}' found")]
    TargetAmbiguous(String),

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("Dump error: {0}")]
    Dump(String),
}
