/// Lifecycle states of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    /// Connection establishment exceeded the bounded open window.
    TimedOut,
    /// Reconnect attempts exhausted; surfaced as a terminal failure.
    MaxAttemptsReached,
    /// Locally requested clean shutdown.
    Closed,
    /// Credentials missing or rejected; never retried.
    AuthFailed,
}

impl ConnectionState {
    /// True for states the manager never leaves.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Closed | Self::MaxAttemptsReached | Self::AuthFailed
        )
    }

    /// True for terminal states callers should surface as failures.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::MaxAttemptsReached | Self::AuthFailed)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Disconnected => "disconnected",
            Self::TimedOut => "timed_out",
            Self::MaxAttemptsReached => "max_attempts_reached",
            Self::Closed => "closed",
            Self::AuthFailed => "auth_failed",
        }
    }
}
