use std::error::Error;
use std::fmt;

use transcript_store::StoreError;

/// Errors surfaced by the conversation controller.
#[derive(Debug)]
pub enum ControllerError {
    /// A chunked stream turn is still in flight; the two turn transports are
    /// mutually exclusive per turn.
    TurnInProgress,
    /// The stream turn request failed at the HTTP layer.
    Http(reqwest::Error),
    /// The chunked response body failed mid-stream. Events decoded before the
    /// failure are already folded into the transcript.
    Stream(String),
    Store(StoreError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnInProgress => write!(f, "a stream turn is already in progress"),
            Self::Http(error) => write!(f, "stream turn request failed: {error}"),
            Self::Stream(message) => write!(f, "stream turn interrupted: {message}"),
            Self::Store(error) => write!(f, "transcript store error: {error}"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(error) => Some(error),
            Self::Store(error) => Some(error),
            Self::TurnInProgress | Self::Stream(_) => None,
        }
    }
}

impl From<reqwest::Error> for ControllerError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error)
    }
}

impl From<StoreError> for ControllerError {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}
