//! Error types for shell-bridge.

use thiserror::Error;

/// Main error type for shell-bridge operations.
#[derive(Error, Debug)]
pub enum ShellBridgeError {
    /// Terminal session with the given ID was not found.
    #[error("terminal not found: {0}")]
    SessionNotFound(String),

    /// The session's shell has exited and can no longer run commands.
    #[error("terminal {0} is closed")]
    SessionClosed(String),

    /// PTY-related error.
    #[error("PTY error: {0}")]
    Pty(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// Channel receive error.
    #[error("channel closed")]
    ChannelClosed,

    /// No workspace root is configured and no override was given.
    #[error("no workspace root directory is available")]
    NoWorkspaceRoot,

    /// Request failed boundary validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Approval prompt with the given ID was not found (or already answered).
    #[error("approval not found: {0}")]
    ApprovalNotFound(String),

    /// The confirmation UI went away before answering.
    #[error("confirmation aborted")]
    ConfirmationAborted,
}

/// Convenience Result type for shell-bridge operations.
pub type Result<T> = std::result::Result<T, ShellBridgeError>;
