use std::time::Duration;

use crate::backoff::BackoffPolicy;

/// Configuration for one managed connection.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// HTTP(S) origin the socket URL is derived from.
    pub origin: String,
    /// Platform deployments connect through the platform socket path and
    /// carry no explicit credential.
    pub platform_mode: bool,
    /// Bearer token, required outside platform mode.
    pub token: Option<String>,
    /// Fixed liveness probe interval.
    pub heartbeat_interval: Duration,
    /// Bounded window for connection establishment.
    pub open_timeout: Duration,
    pub backoff: BackoffPolicy,
    /// Failed attempts tolerated before giving up.
    pub max_attempts: u32,
    /// Outbound queue bound while disconnected; oldest messages drop first.
    pub queue_cap: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            origin: String::new(),
            platform_mode: false,
            token: None,
            heartbeat_interval: Duration::from_secs(30),
            open_timeout: Duration::from_secs(10),
            backoff: BackoffPolicy::default(),
            max_attempts: 10,
            queue_cap: 64,
        }
    }
}

impl SocketConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_platform_mode(mut self, platform_mode: bool) -> Self {
        self.platform_mode = platform_mode;
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_queue_cap(mut self, queue_cap: usize) -> Self {
        self.queue_cap = queue_cap;
        self
    }
}
