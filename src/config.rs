//! Runtime configuration.
//!
//! Everything is environment-driven with sensible defaults, so the binary
//! and the tests can both construct a config without a file on disk.
//!
//! # Environment Variables
//!
//! - `METAREASON_GATEWAY_URL` — Ollama-compatible base URL (default `http://localhost:11434`)
//! - `METAREASON_MODEL` — model used for activation/extraction (default `gemma3:4b`)
//! - `METAREASON_SKILLS_DIR` — directory of persisted skill records (default `skills_data`)
//! - `METAREASON_MAX_CONCURRENCY` — bounded fan-out for gateway calls (default 4)
//! - `METAREASON_GATEWAY_TIMEOUT_SECS` — per-call deadline (default 60)
//! - `PORT` — editing-surface HTTP port (default 8080)

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::gateway::CompletionOptions;

/// Application-wide settings shared by the engine, harness, and server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the Ollama-compatible gateway.
    pub gateway_url: String,
    /// Model identifier passed on every gateway call.
    pub model: String,
    /// Directory holding one JSON record per user-defined skill.
    pub skills_dir: PathBuf,
    /// Maximum concurrent in-flight gateway calls per dispatch cycle.
    pub max_concurrency: usize,
    /// Per-call gateway deadline; expiry is a per-skill failure.
    pub gateway_timeout: Duration,
    /// Editing-surface HTTP port.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:11434".to_string(),
            model: "gemma3:4b".to_string(),
            skills_dir: PathBuf::from("skills_data"),
            max_concurrency: 4,
            gateway_timeout: Duration::from_secs(60),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Build a config from the environment, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            gateway_url: env_or("METAREASON_GATEWAY_URL", defaults.gateway_url),
            model: env_or("METAREASON_MODEL", defaults.model),
            skills_dir: std::env::var("METAREASON_SKILLS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.skills_dir),
            max_concurrency: env_parsed("METAREASON_MAX_CONCURRENCY", defaults.max_concurrency),
            gateway_timeout: Duration::from_secs(env_parsed(
                "METAREASON_GATEWAY_TIMEOUT_SECS",
                defaults.gateway_timeout.as_secs(),
            )),
            port: env_parsed("PORT", defaults.port),
        }
    }

    /// Engine knobs derived from these settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrency: self.max_concurrency,
            gateway_timeout: self.gateway_timeout,
            options: CompletionOptions::for_model(self.model.clone()),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring unparseable {}={}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.max_concurrency, 4);
        assert_eq!(cfg.gateway_timeout, Duration::from_secs(60));
        assert_eq!(cfg.skills_dir, PathBuf::from("skills_data"));
    }

    #[test]
    fn test_engine_config_inherits_settings() {
        let mut cfg = AppConfig::default();
        cfg.max_concurrency = 8;
        let engine = cfg.engine_config();
        assert_eq!(engine.max_concurrency, 8);
        assert_eq!(engine.options.model, cfg.model);
    }
}
