use std::fmt;

/// Decode failure for a single inbound frame or stream record.
///
/// A `WireError` never aborts a connection; callers log the error and drop the
/// offending frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    Protocol(String),
}

impl WireError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(message) => write!(f, "protocol error: {message}"),
        }
    }
}

impl std::error::Error for WireError {}
