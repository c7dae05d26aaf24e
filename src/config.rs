//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is loaded first when present, so local setups can
//! keep their endpoints out of the shell profile.

use reqwest::Url;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::DEFAULT_TARGET_RANK;
use crate::feed::BackoffPolicy;
use crate::sync::EngineConfig;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the snapshot and ticket API
    pub api_url: String,
    /// WebSocket URL of the push feed
    pub ws_url: String,
    /// Directory holding the persisted identity; `None` keeps it in memory only
    pub data_dir: Option<PathBuf>,
    /// Rank new tickets are routed to
    pub target_rank: String,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// How long triggers are collected before fetching
    pub coalesce_window: Duration,
    /// First reconnect delay
    pub backoff_initial: Duration,
    /// Upper bound on the reconnect delay
    pub backoff_max: Duration,
}

impl Default for Config {
    /// Defaults for every optional setting.
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            ws_url: "ws://localhost:3000/ws".to_string(),
            data_dir: Some(PathBuf::from(".wallet-sync")),
            target_rank: DEFAULT_TARGET_RANK.to_string(),
            http_timeout: Duration::from_secs(30),
            coalesce_window: Duration::from_millis(25),
            backoff_initial: Duration::from_millis(1000),
            backoff_max: Duration::from_millis(30_000),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("WALLET_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("WALLET_API_URL"))?;

        let ws_url = match lookup("WALLET_WS_URL").map(|v| v.trim().to_string()) {
            Some(url) if !url.is_empty() => url,
            _ => derive_ws_url(&api_url)?,
        };

        Ok(Self {
            ws_url,
            // Set but empty means the identity is not persisted
            data_dir: match lookup("WALLET_DATA_DIR").map(|v| v.trim().to_string()) {
                Some(dir) if dir.is_empty() => None,
                Some(dir) => Some(PathBuf::from(dir)),
                None => defaults.data_dir,
            },
            target_rank: lookup("WALLET_TARGET_RANK")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.target_rank),
            http_timeout: read_duration(&lookup, "WALLET_HTTP_TIMEOUT_SECS", Duration::from_secs)?
                .unwrap_or(defaults.http_timeout),
            coalesce_window: read_duration(&lookup, "WALLET_COALESCE_MS", Duration::from_millis)?
                .unwrap_or(defaults.coalesce_window),
            backoff_initial: read_duration(
                &lookup,
                "WALLET_BACKOFF_INITIAL_MS",
                Duration::from_millis,
            )?
            .unwrap_or(defaults.backoff_initial),
            backoff_max: read_duration(&lookup, "WALLET_BACKOFF_MAX_MS", Duration::from_millis)?
                .unwrap_or(defaults.backoff_max),
            api_url,
        })
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: self.backoff_initial,
            max: self.backoff_max.max(self.backoff_initial),
            ..BackoffPolicy::default()
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            coalesce_window: self.coalesce_window,
        }
    }
}

fn read_duration<F>(
    lookup: &F,
    key: &'static str,
    unit: fn(u64) -> Duration,
) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|value| Some(unit(value)))
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

/// Push feed URL for an API URL: same host, `ws`/`wss` scheme, path `/ws`.
pub fn derive_ws_url(api_url: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: "WALLET_API_URL",
        value: api_url.to_string(),
    };

    let mut url = Url::parse(api_url).map_err(|_| invalid())?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return Err(invalid()),
    };
    url.set_scheme(scheme).map_err(|_| invalid())?;
    url.set_path("/ws");
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[("WALLET_API_URL", "http://localhost:8080")]))
                .expect("Config should load");

        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.ws_url, "ws://localhost:8080/ws");
        assert_eq!(config.data_dir, Some(PathBuf::from(".wallet-sync")));
        assert_eq!(config.target_rank, "marshal");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.coalesce_window, Duration::from_millis(25));
        assert_eq!(config.backoff_policy().initial, Duration::from_secs(1));
        assert_eq!(config.backoff_policy().max, Duration::from_secs(30));
    }

    #[test]
    fn test_api_url_is_required() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WALLET_API_URL")));

        let err = Config::from_lookup(lookup_from(&[("WALLET_API_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WALLET_API_URL")));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("WALLET_API_URL", "https://api.example.com"),
            ("WALLET_WS_URL", "wss://push.example.com/feed"),
            ("WALLET_DATA_DIR", "/tmp/wallet"),
            ("WALLET_HTTP_TIMEOUT_SECS", "5"),
            ("WALLET_COALESCE_MS", "100"),
            ("WALLET_BACKOFF_INITIAL_MS", "250"),
            ("WALLET_BACKOFF_MAX_MS", "4000"),
            ("WALLET_TARGET_RANK", "executor"),
        ]))
        .expect("Config should load");

        assert_eq!(config.ws_url, "wss://push.example.com/feed");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/wallet")));
        assert_eq!(config.target_rank, "executor");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.engine_config().coalesce_window, Duration::from_millis(100));
        assert_eq!(config.backoff_policy().initial, Duration::from_millis(250));
        assert_eq!(config.backoff_policy().max, Duration::from_millis(4000));
    }

    #[test]
    fn test_empty_data_dir_disables_persistence() {
        let config = Config::from_lookup(lookup_from(&[
            ("WALLET_API_URL", "http://localhost"),
            ("WALLET_DATA_DIR", ""),
        ]))
        .expect("Config should load");
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("WALLET_API_URL", "http://localhost"),
            ("WALLET_COALESCE_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "WALLET_COALESCE_MS",
                ..
            }
        ));
    }

    #[test]
    fn test_derive_ws_url() {
        assert_eq!(
            derive_ws_url("https://api.example.com/v1?x=1").unwrap(),
            "wss://api.example.com/ws"
        );
        assert_eq!(
            derive_ws_url("http://127.0.0.1:3000/").unwrap(),
            "ws://127.0.0.1:3000/ws"
        );
        assert!(derive_ws_url("ftp://example.com").is_err());
        assert!(derive_ws_url("not a url").is_err());
    }
}
