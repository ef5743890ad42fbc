//! Control session error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for control session operations.
pub type CtlResult<T> = Result<T, CtlError>;

/// Errors raised by a control session.
#[derive(Debug, Error)]
pub enum CtlError {
    #[error("failed to connect to {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection closed")]
    Closed,
}

impl CtlError {
    /// True when the error came from a read or write timing out.
    pub fn is_timeout(&self) -> bool {
        match self {
            CtlError::Send(e) | CtlError::Receive(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}
