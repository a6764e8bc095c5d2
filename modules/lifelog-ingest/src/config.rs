//! Runtime configuration.
//!
//! Resolution order, later wins: defaults, TOML config file, environment
//! (including `.env`), command-line flags (applied by `main`).

use crate::error::ConfigError;
use crate::limitless_api::DEFAULT_API_URL;
use crate::remote::{DEFAULT_BACKOFF, DEFAULT_PAGE_LIMIT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = ".lifelog-ingest.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub output_root: PathBuf,
    pub token: Option<String>,
    pub url: String,
    pub rate_limit_backoff: Duration,
    pub page_limit: u32,
    /// Stamped into every record's `exportVersion`.
    pub export_version: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("./out"),
            token: None,
            url: DEFAULT_API_URL.to_string(),
            rate_limit_backoff: DEFAULT_BACKOFF,
            page_limit: DEFAULT_PAGE_LIMIT,
            export_version: default_export_version(),
        }
    }
}

pub fn default_export_version() -> String {
    format!("lifelog-ingest {}", env!("CARGO_PKG_VERSION"))
}

/// Keys accepted in the TOML config file. All optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub output_root: Option<PathBuf>,
    pub token: Option<String>,
    pub url: Option<String>,
    pub rate_limit_backoff_secs: Option<u64>,
    pub page_limit: Option<u32>,
    pub export_version: Option<String>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_str(&content)
            .map_err(|e| ConfigError(format!("{} in {}", e.0, path.display())))
    }

    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError(format!("Failed to parse config: {}", e)))
    }
}

impl IngestConfig {
    /// Loads the config file (explicit path, or `$HOME/.lifelog-ingest.toml`
    /// when present) and layers the process environment on top.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => FileConfig::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => {
                    log::info!("[INGEST] Using config file: {}", path.display());
                    FileConfig::from_file(&path)?
                }
                None => FileConfig::default(),
            },
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merges defaults, file values and `env` lookups.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let backoff_secs = match env("LIFELOG_RATE_LIMIT_BACKOFF_SECS") {
            Some(v) => Some(parse_number::<u64>("LIFELOG_RATE_LIMIT_BACKOFF_SECS", &v)?),
            None => file.rate_limit_backoff_secs,
        };
        let page_limit = match env("LIFELOG_PAGE_LIMIT") {
            Some(v) => Some(parse_number::<u32>("LIFELOG_PAGE_LIMIT", &v)?),
            None => file.page_limit,
        };
        if page_limit == Some(0) {
            return Err(ConfigError("page_limit must be at least 1".to_string()));
        }

        Ok(Self {
            output_root: env("LIFELOG_OUT")
                .map(PathBuf::from)
                .or(file.output_root)
                .unwrap_or(defaults.output_root),
            token: env("LIFELOG_TOKEN").or(file.token),
            url: env("LIFELOG_URL").or(file.url).unwrap_or(defaults.url),
            rate_limit_backoff: backoff_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_backoff),
            page_limit: page_limit.unwrap_or(defaults.page_limit),
            export_version: file.export_version.unwrap_or(defaults.export_version),
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_CONFIG_FILE))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError(format!("{} must be a valid number, got {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = IngestConfig::resolve(FileConfig::default(), env_from(&[])).unwrap();
        assert_eq!(config, IngestConfig::default());
        assert_eq!(config.rate_limit_backoff, Duration::from_secs(30));
        assert!(config.export_version.starts_with("lifelog-ingest "));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileConfig::from_str(
            r#"
output_root = "/data/lifelogs"
token = "file-token"
url = "https://file.example/lifelogs"
rate_limit_backoff_secs = 5
export_version = "custom 1.0"
"#,
        )
        .unwrap();
        let config = IngestConfig::resolve(
            file,
            env_from(&[("LIFELOG_TOKEN", "env-token"), ("LIFELOG_PAGE_LIMIT", "25")]),
        )
        .unwrap();

        assert_eq!(config.output_root, PathBuf::from("/data/lifelogs"));
        assert_eq!(config.token.as_deref(), Some("env-token"));
        assert_eq!(config.url, "https://file.example/lifelogs");
        assert_eq!(config.rate_limit_backoff, Duration::from_secs(5));
        assert_eq!(config.page_limit, 25);
        assert_eq!(config.export_version, "custom 1.0");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let config =
            IngestConfig::resolve(FileConfig::default(), env_from(&[("LIFELOG_OUT", "  ")]))
                .unwrap();
        assert_eq!(config.output_root, PathBuf::from("./out"));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = IngestConfig::resolve(
            FileConfig::default(),
            env_from(&[("LIFELOG_RATE_LIMIT_BACKOFF_SECS", "soon")]),
        )
        .unwrap_err();
        assert!(err.0.contains("LIFELOG_RATE_LIMIT_BACKOFF_SECS"));

        let err = IngestConfig::resolve(FileConfig::default(), env_from(&[("LIFELOG_PAGE_LIMIT", "0")]))
            .unwrap_err();
        assert!(err.0.contains("page_limit"));
    }

    #[test]
    fn test_unknown_file_keys_are_rejected() {
        assert!(FileConfig::from_str("tokne = \"typo\"").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IngestConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.0.contains("nope.toml"));
    }
}
