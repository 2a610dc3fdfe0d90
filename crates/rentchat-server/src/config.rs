//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Which store backs threads and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Lost on restart.
    Memory,
    Sqlite,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Env: `STORE_BACKEND` (`memory` | `sqlite`)
    /// Default: `memory`
    pub backend: BackendKind,

    /// SQLite file, only used with the sqlite backend.
    /// Env: `DATABASE_PATH`
    /// Default: `rentchat.db` in the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Load the demo conversations into an empty store.
    /// Env: `SEED_DEMO_DATA` (true/false)
    /// Default: `true`
    pub seed_demo_data: bool,

    /// A typing flag older than this reads as not typing.
    /// Env: `TYPING_STALE_SECS`
    /// Default: `8`
    pub typing_stale_after: Duration,

    /// Presence entries idle this long are dropped by the purge task.
    /// Env: `TYPING_PURGE_SECS`
    /// Default: `600`
    pub typing_purge_after: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            backend: BackendKind::Memory,
            database_path: None,
            seed_demo_data: true,
            typing_stale_after: rentchat_store::typing::DEFAULT_STALE_AFTER,
            typing_purge_after: Duration::from_secs(600),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = get("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(val) = get("STORE_BACKEND") {
            match val.parse::<BackendKind>() {
                Ok(kind) => config.backend = kind,
                Err(e) => tracing::warn!(error = %e, "Invalid STORE_BACKEND, using memory"),
            }
        }

        if let Some(path) = get("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = get("SEED_DEMO_DATA") {
            config.seed_demo_data = val != "false" && val != "0";
        }

        if let Some(secs) = parse_secs(get("TYPING_STALE_SECS"), "TYPING_STALE_SECS") {
            config.typing_stale_after = secs;
        }

        if let Some(secs) = parse_secs(get("TYPING_PURGE_SECS"), "TYPING_PURGE_SECS") {
            config.typing_purge_after = secs;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn parse_secs(raw: Option<String>, key: &str) -> Option<Duration> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(Duration::from_secs(n)),
        _ => {
            tracing::warn!(key, value = %raw, "Invalid duration, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.backend, BackendKind::Memory);
        assert!(config.seed_demo_data);
        assert_eq!(config.typing_stale_after, Duration::from_secs(8));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("STORE_BACKEND", "SQLite"),
            ("DATABASE_PATH", "/tmp/chat.db"),
            ("SEED_DEMO_DATA", "0"),
            ("TYPING_STALE_SECS", "12"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/chat.db")));
        assert!(!config.seed_demo_data);
        assert_eq!(config.typing_stale_after, Duration::from_secs(12));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = load(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("STORE_BACKEND", "postgres"),
            ("TYPING_PURGE_SECS", "-5"),
        ]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.typing_purge_after, Duration::from_secs(600));
    }
}
