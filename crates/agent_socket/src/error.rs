use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketError {
    /// No bearer token configured outside platform mode.
    MissingToken,
    InvalidOrigin(String),
    /// Underlying transport failure (connect or send).
    Transport(String),
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "bearer token is required outside platform mode"),
            Self::InvalidOrigin(origin) => write!(f, "invalid connection origin: {origin}"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
        }
    }
}

impl std::error::Error for SocketError {}
