//! Endpoint configuration for the order service and the push channel.

use std::time::Duration;

/// Default timeout for order service requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the dashboard talks to.
///
/// `base_url` is the service origin; request paths are appended under `/api`.
/// `push_url` is the WebSocket endpoint of the push channel, derived from the
/// base by default. `auth_token` is a pre-resolved session token — credential
/// storage itself lives outside this crate; when present it is attached as a
/// bearer header on every request.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub push_url: String,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn new(base_url: &str) -> Self {
        let base_url = normalize_base_url(base_url);
        let push_url = derive_push_url(&base_url);
        Self {
            base_url,
            push_url,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    pub fn with_push_url(mut self, url: &str) -> Self {
        self.push_url = url.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new("http://localhost:5000")
    }
}

/// Normalise the order service URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
/// - strip a trailing `/api` segment (the client appends it per-request)
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /api
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    // Strip trailing slashes again (in case "/api/" was present)
    while url.ends_with('/') {
        url.pop();
    }

    url
}

/// WebSocket endpoint for a given service origin.
fn derive_push_url(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://pos.example.com/"),
            "https://pos.example.com"
        );
        assert_eq!(
            normalize_base_url("pos.example.com/api/"),
            "https://pos.example.com"
        );
        assert_eq!(
            normalize_base_url("localhost:5000"),
            "http://localhost:5000"
        );
        assert_eq!(
            normalize_base_url(" http://127.0.0.1:5000/api "),
            "http://127.0.0.1:5000"
        );
    }

    #[test]
    fn test_push_url_follows_scheme() {
        assert_eq!(
            ServiceConfig::new("https://pos.example.com").push_url,
            "wss://pos.example.com"
        );
        assert_eq!(
            ServiceConfig::new("localhost:5000").push_url,
            "ws://localhost:5000"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = ServiceConfig::new("localhost:5000")
            .with_token("tok")
            .with_push_url("ws://push.example.com")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.push_url, "ws://push.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
