//! Error types for the mock server client.
//!
//! # Design
//! Every variant's `Display` output is the bare message with no prefix:
//! URL parser, transport and decoder messages pass through unchanged, and
//! server/verification messages are the fixed texts callers assert on.
//! `kind()` gives callers a fieldless discriminator to branch on.

use std::fmt;

/// Errors returned by `Mocker` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockerError {
    /// `{base}/mocks` is not an absolute URL. Raised before any I/O.
    InvalidRequest(String),

    /// The round trip could not be completed (DNS, refused connection,
    /// unsupported scheme, broken body stream).
    Transport(String),

    /// The server answered with a status the operation does not accept.
    Server { status: u16, message: String },

    /// The response body is not the expected JSON shape.
    Decode(String),

    /// A value could not be encoded as JSON.
    Serialization(String),

    /// Expected calls were never made and/or unexpected calls were observed.
    Verification {
        missing: usize,
        unexpected: usize,
        message: String,
    },
}

/// Fieldless discriminator over `MockerError` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    Transport,
    Server,
    Decode,
    Serialization,
    Verification,
}

impl MockerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MockerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            MockerError::Transport(_) => ErrorKind::Transport,
            MockerError::Server { .. } => ErrorKind::Server,
            MockerError::Decode(_) => ErrorKind::Decode,
            MockerError::Serialization(_) => ErrorKind::Serialization,
            MockerError::Verification { .. } => ErrorKind::Verification,
        }
    }
}

impl fmt::Display for MockerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockerError::InvalidRequest(msg)
            | MockerError::Transport(msg)
            | MockerError::Decode(msg)
            | MockerError::Serialization(msg) => f.write_str(msg),
            MockerError::Server { message, .. } | MockerError::Verification { message, .. } => {
                f.write_str(message)
            }
        }
    }
}

impl std::error::Error for MockerError {}
