//! Backend client configuration.
//!
//! A single project URL fronts every backend surface: `rest/v1` (tables),
//! `auth/v1` (accounts and sessions) and `realtime/v1` (change streams).
//! Defaults point at a local development backend. Override via environment
//! variables or explicit construction for staging/testing.

use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

/// Default project URL: the local development backend.
pub const DEFAULT_URL: &str = "http://127.0.0.1:54321";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the hosted backend.
///
/// Custom `Debug` implementation redacts the `anon_key` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ClientConfig {
    /// Project base URL, e.g. `https://abc.example.co`.
    pub base_url: Url,
    /// Public anonymous API key. Sent as `apikey` on every request and as
    /// the bearer token while no user is signed in.
    pub anon_key: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Realtime socket behaviour.
    pub realtime: RealtimeConfig,
}

/// Realtime socket timing: join acknowledgement, heartbeats and reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// How long a subscription waits for the server to acknowledge its join.
    pub join_timeout: Duration,
    /// Interval between heartbeats. A heartbeat still unanswered when the
    /// next one is due counts as a lost socket.
    pub heartbeat_interval: Duration,
    /// Delay before each reconnect attempt after the socket drops. The last
    /// entry repeats.
    pub reconnect_backoff: Vec<Duration>,
    /// Consecutive failed reconnects after which every subscription is
    /// dropped.
    pub max_reconnect_attempts: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_secs(10),
            heartbeat_interval: crate::realtime::HEARTBEAT_INTERVAL,
            reconnect_backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(10),
            ],
            max_reconnect_attempts: 10,
        }
    }
}

impl RealtimeConfig {
    /// Delay before reconnect attempt `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let index = usize::try_from(attempt).unwrap_or(usize::MAX);
        self.reconnect_backoff
            .get(index)
            .or(self.reconnect_backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("anon_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("realtime", &self.realtime)
            .finish()
    }
}

impl ClientConfig {
    /// Build a configuration from explicit values.
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        let anon_key = anon_key.into();
        if anon_key.is_empty() {
            return Err(ConfigError::MissingAnonKey);
        }
        Ok(Self {
            base_url: parse_base_url("base_url", base_url)?,
            anon_key: Zeroizing::new(anon_key),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            realtime: RealtimeConfig::default(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CIRCLE_URL` (default: `http://127.0.0.1:54321`)
    /// - `CIRCLE_ANON_KEY` (required)
    /// - `CIRCLE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let anon_key = std::env::var("CIRCLE_ANON_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingAnonKey)?;
        let raw_url = std::env::var("CIRCLE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());

        Ok(Self {
            base_url: parse_base_url("CIRCLE_URL", &raw_url)?,
            anon_key: Zeroizing::new(anon_key),
            timeout_secs: std::env::var("CIRCLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            realtime: RealtimeConfig::default(),
        })
    }

    /// Create a configuration pointing at a local mock server (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the localhost URL cannot be parsed
    /// (should not occur for valid port numbers, but avoids `expect()`).
    pub fn local(port: u16, anon_key: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("localhost", &format!("http://127.0.0.1:{port}"))?,
            anon_key: Zeroizing::new(anon_key.to_string()),
            timeout_secs: 5,
            realtime: RealtimeConfig::default(),
        })
    }
}

/// Parse a base URL and make sure its path ends in `/`, so that
/// `Url::join("rest/v1/..")` appends rather than replaces the last segment.
fn parse_base_url(source: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(source.to_string(), e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CIRCLE_ANON_KEY environment variable is required")]
    MissingAnonKey,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_builds_valid_config() {
        let cfg = ClientConfig::local(9000, "anon").unwrap();
        assert_eq!(cfg.anon_key.as_str(), "anon");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let cfg = ClientConfig::new("https://example.com/project", "anon").unwrap();
        assert_eq!(cfg.base_url.as_str(), "https://example.com/project/");
        let joined = cfg.base_url.join("rest/v1/profiles").unwrap();
        assert_eq!(joined.as_str(), "https://example.com/project/rest/v1/profiles");
    }

    #[test]
    fn reconnect_backoff_repeats_last_delay() {
        let realtime = RealtimeConfig::default();
        assert_eq!(realtime.backoff(0), Duration::from_secs(1));
        assert_eq!(realtime.backoff(3), Duration::from_secs(10));
        assert_eq!(realtime.backoff(9), Duration::from_secs(10));

        let empty = RealtimeConfig {
            reconnect_backoff: Vec::new(),
            ..RealtimeConfig::default()
        };
        assert_eq!(empty.backoff(0), Duration::ZERO);
    }

    #[test]
    fn empty_anon_key_is_rejected() {
        assert!(matches!(
            ClientConfig::new("https://example.com", ""),
            Err(ConfigError::MissingAnonKey)
        ));
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            ClientConfig::new("not a url", "anon"),
            Err(ConfigError::InvalidUrl(..))
        ));
    }

    #[test]
    fn debug_redacts_anon_key() {
        let cfg = ClientConfig::new("https://example.com", "super-secret").unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
