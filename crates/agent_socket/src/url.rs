use crate::config::SocketConfig;
use crate::error::SocketError;

/// Platform-mode socket path, relative to the origin.
pub const PLATFORM_SOCKET_PATH: &str = "/platform/ws";
/// Token-authenticated socket path, relative to the origin.
pub const SOCKET_PATH: &str = "/ws";

/// Derive the websocket URL for a socket configuration.
///
/// Derivation rules:
/// 1) the `http(s)` origin scheme maps to `ws(s)`
/// 2) platform mode connects through the platform socket path
/// 3) otherwise the bearer token rides as a query parameter; a missing token
///    is an error the manager surfaces as `auth_failed`
pub fn socket_url(config: &SocketConfig) -> Result<String, SocketError> {
    let origin = config.origin.trim().trim_end_matches('/');
    if origin.is_empty() {
        return Err(SocketError::InvalidOrigin("empty origin".to_string()));
    }

    let ws_origin = if let Some(rest) = origin.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = origin.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if origin.starts_with("wss://") || origin.starts_with("ws://") {
        origin.to_string()
    } else {
        return Err(SocketError::InvalidOrigin(origin.to_string()));
    };

    if config.platform_mode {
        return Ok(format!("{ws_origin}{PLATFORM_SOCKET_PATH}"));
    }

    match config
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
    {
        Some(token) => Ok(format!("{ws_origin}{SOCKET_PATH}?token={token}")),
        None => Err(SocketError::MissingToken),
    }
}
