//! Call failures as seen by the view.

use bridge_types::RemoteError;
use thiserror::Error;

/// Why a call did not produce a result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    /// The host answered with an error.
    #[error("{message}")]
    Remote { message: String, code: Option<i32> },

    /// The Request could not be sent.
    #[error("channel failed: {0}")]
    Channel(String),

    /// The pending entry was removed before a Response arrived.
    #[error("call was dropped before a response arrived")]
    Dropped,

    /// The result did not have the expected shape.
    #[error("unexpected result shape: {0}")]
    Decode(String),
}

impl CallError {
    /// Error message from the host, if the host answered.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            CallError::Remote { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Structured code from the host, if it sent one.
    pub fn code(&self) -> Option<i32> {
        match self {
            CallError::Remote { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<RemoteError> for CallError {
    fn from(err: RemoteError) -> Self {
        CallError::Remote {
            message: err.message,
            code: err.code,
        }
    }
}
