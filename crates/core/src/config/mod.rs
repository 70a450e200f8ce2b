//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The manifest and generation tag are deploy-time values: they are read
//! once, validated, and never mutated afterwards.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::MatchMode;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application prefix of every generation name.
    ///
    /// Set via SHELLCACHE_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag of the current generation.
    ///
    /// Set via SHELLCACHE_VERSION environment variable. Changing it makes
    /// the next activation drop every older generation.
    #[serde(default = "default_version")]
    pub version: String,

    /// Base URL of the application; relative manifest paths resolve against it.
    ///
    /// Set via SHELLCACHE_BASE_URL environment variable.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Assets fetched into the current generation during setup.
    ///
    /// Set via SHELLCACHE_MANIFEST environment variable (`[a, b]` array syntax).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Documents served, in order, for offline navigations.
    ///
    /// Set via SHELLCACHE_FALLBACK_DOCUMENTS environment variable.
    #[serde(default = "default_fallback_documents")]
    pub fallback_documents: Vec<String>,

    /// How intercepted requests are compared with stored identities.
    ///
    /// Set via SHELLCACHE_MATCH_MODE environment variable (`exact` or `ignore_search`).
    #[serde(default)]
    pub match_mode: MatchMode,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SHELLCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum manifest fetches in flight during setup.
    ///
    /// Set via SHELLCACHE_SETUP_CONCURRENCY environment variable.
    #[serde(default = "default_setup_concurrency")]
    pub setup_concurrency: usize,
}

fn default_cache_prefix() -> String {
    "concentrato".into()
}

fn default_version() -> String {
    "v7".into()
}

fn default_base_url() -> String {
    "http://localhost:8080/".into()
}

fn default_manifest() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./manifest.json",
        "./sw.js",
        "./concentrato.png",
        "https://cdn.tailwindcss.com",
        "https://cdn.jsdelivr.net/npm/chart.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_fallback_documents() -> Vec<String> {
    vec!["./index.html".into(), "./".into()]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_setup_concurrency() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            base_url: default_base_url(),
            manifest: default_manifest(),
            fallback_documents: default_fallback_documents(),
            match_mode: MatchMode::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            setup_concurrency: default_setup_concurrency(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the current generation, `{cache_prefix}-{version}`.
    pub fn generation_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    /// Parsed application base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `base_url` is not an absolute http(s) URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid {
                field: "base_url".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.generation_name(), "concentrato-v7");
        assert_eq!(config.db_path, PathBuf::from("./shellcache.sqlite"));
        assert_eq!(config.user_agent, "shellcache/0.1");
        assert_eq!(config.manifest.len(), 7);
        assert_eq!(config.manifest[0], "./");
        assert_eq!(config.fallback_documents, vec!["./index.html", "./"]);
        assert_eq!(config.match_mode, MatchMode::IgnoreSearch);
        assert_eq!(config.setup_concurrency, 4);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_base_url_parsed() {
        let config = AppConfig { base_url: "https://example.com/app/".into(), ..Default::default() };
        assert_eq!(config.base_url().unwrap().path(), "/app/");
    }

    #[test]
    fn test_base_url_rejects_scheme() {
        let config = AppConfig { base_url: "file:///srv/app/".into(), ..Default::default() };
        assert!(matches!(config.base_url(), Err(ConfigError::Invalid { field, .. }) if field == "base_url"));
    }

    #[test]
    fn test_load_from_env_and_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "shellcache.toml",
                r#"
                version = "v8"
                manifest = ["./", "./index.html"]
                match_mode = "exact"
                "#,
            )?;
            jail.set_env("SHELLCACHE_CONFIG_FILE", "shellcache.toml");
            jail.set_env("SHELLCACHE_CACHE_PREFIX", "notes");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.generation_name(), "notes-v8");
            assert_eq!(config.manifest, vec!["./", "./index.html"]);
            assert_eq!(config.match_mode, MatchMode::Exact);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHELLCACHE_SETUP_CONCURRENCY", "0");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "setup_concurrency"));
            Ok(())
        });
    }
}
