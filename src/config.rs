use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },
}

/// Runtime settings, read from the process environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Compute server receiving measurement requests. Requests are
    /// disabled when unset.
    pub server_url: Option<String>,
    pub cache_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub log_dir: PathBuf,
    pub catalog_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: None,
            cache_dir: PathBuf::from("cache_dir"),
            catalog_path: PathBuf::from("datasets/catalog.json"),
            log_dir: PathBuf::from("log_files"),
            catalog_ttl: Duration::from_secs(3600),
        }
    }
}

impl Settings {
    /// Load `.env` from the working directory when present, then read the
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if Path::new(".env").is_file() {
            if let Err(e) = dotenv::from_filename(".env") {
                // The logger is not up yet.
                eprintln!("[data_measurements_tool] ignoring unreadable .env: {e}");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        settings.server_url = lookup("SERVER_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if let Some(dir) = lookup("DMT_CACHE_DIR") {
            settings.cache_dir = non_empty_path("DMT_CACHE_DIR", dir)?;
        }
        if let Some(path) = lookup("DMT_CATALOG") {
            settings.catalog_path = non_empty_path("DMT_CATALOG", path)?;
        }
        if let Some(dir) = lookup("DMT_LOG_DIR") {
            settings.log_dir = non_empty_path("DMT_LOG_DIR", dir)?;
        }
        if let Some(value) = lookup("DMT_CATALOG_TTL_SECS") {
            let secs = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidSeconds {
                    key: "DMT_CATALOG_TTL_SECS",
                    value: value.clone(),
                })?;
            settings.catalog_ttl = Duration::from_secs(secs);
        }

        Ok(settings)
    }
}

fn non_empty_path(key: &'static str, value: String) -> Result<PathBuf, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty { key });
    }
    Ok(PathBuf::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.server_url.is_none());
    }

    #[test]
    fn reads_every_key() {
        let settings = Settings::from_lookup(lookup(&[
            ("SERVER_URL", " http://compute.local/run "),
            ("DMT_CACHE_DIR", "/var/cache/dmt"),
            ("DMT_CATALOG", "/srv/catalog.json"),
            ("DMT_LOG_DIR", "/var/log/dmt"),
            ("DMT_CATALOG_TTL_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(settings.server_url.as_deref(), Some("http://compute.local/run"));
        assert_eq!(settings.cache_dir, PathBuf::from("/var/cache/dmt"));
        assert_eq!(settings.catalog_path, PathBuf::from("/srv/catalog.json"));
        assert_eq!(settings.log_dir, PathBuf::from("/var/log/dmt"));
        assert_eq!(settings.catalog_ttl, Duration::from_secs(60));
    }

    #[test]
    fn blank_server_url_disables_requests() {
        let settings = Settings::from_lookup(lookup(&[("SERVER_URL", "  ")])).unwrap();
        assert!(settings.server_url.is_none());
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            Settings::from_lookup(lookup(&[("DMT_CATALOG_TTL_SECS", "an hour")])),
            Err(ConfigError::InvalidSeconds { .. })
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[("DMT_CACHE_DIR", "")])),
            Err(ConfigError::Empty { .. })
        ));
    }
}
