//! Endpoint validation.

use crate::error::{WsError, WsResult};
use url::Url;

/// Parse and validate an upstream endpoint.
///
/// Accepts absolute `ws://` or `wss://` URLs with a host.
pub fn parse_endpoint(raw: &str) -> WsResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WsError::InvalidEndpoint("endpoint is empty".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| WsError::InvalidEndpoint(format!("{trimmed}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(WsError::InvalidEndpoint(format!(
                "{trimmed}: unsupported scheme '{other}' (expected ws or wss)"
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(WsError::InvalidEndpoint(format!("{trimmed}: missing host")));
    }

    Ok(url)
}
