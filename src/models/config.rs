//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Primary registry endpoints
    #[serde(default)]
    pub registry: RegistryConfig,

    /// HTTP and fetching behavior settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Batch scheduling
    #[serde(default)]
    pub batch: BatchConfig,

    /// Fuzzy matching against the reference index
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Reference datasets and their local cache
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Output artifact settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.registry.base_url.trim().is_empty() {
            return Err(AppError::validation("registry.base_url is empty"));
        }
        url::Url::parse(&self.registry.base_url)?;
        if self.registry.page_limit == 0 {
            return Err(AppError::validation("registry.page_limit must be > 0"));
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.max_concurrent == 0 {
            return Err(AppError::validation("fetch.max_concurrent must be > 0"));
        }
        if self.batch.size == 0 {
            return Err(AppError::validation("batch.size must be > 0"));
        }
        if !(0.0..=100.0).contains(&self.matching.threshold) {
            return Err(AppError::validation(
                "matching.threshold must be within 0..=100",
            ));
        }
        if self.reference.enabled_datasets().next().is_none() {
            return Err(AppError::validation("No reference datasets enabled"));
        }
        Ok(())
    }
}

/// Primary registry (Livsmedelsverket) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// API root, e.g. `https://host/livsmedel/api/v1`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Items requested per listing page
    #[serde(default = "defaults::page_limit")]
    pub page_limit: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            page_limit: defaults::page_limit(),
        }
    }
}

/// HTTP client and fetching behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay before each entity's sub-request fan-out, in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum entities in flight
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Wait before the single retry of a rate-limited sub-request
    #[serde(default = "defaults::rate_limit_backoff")]
    pub rate_limit_backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            rate_limit_backoff_ms: defaults::rate_limit_backoff(),
        }
    }
}

/// Batch scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Entities per batch
    #[serde(default = "defaults::batch_size")]
    pub size: usize,

    /// Pause between batches in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: defaults::batch_size(),
            delay_ms: 0,
        }
    }
}

/// Fuzzy matching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// A candidate is accepted only when its score is strictly above this
    #[serde(default = "defaults::threshold")]
    pub threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::threshold(),
        }
    }
}

/// Reference dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Directory holding downloaded archives
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: PathBuf,

    /// Datasets merged into the index, in order (later entries win)
    #[serde(default = "defaults::datasets")]
    pub datasets: Vec<DatasetSource>,
}

impl ReferenceConfig {
    /// Datasets that take part in the run, in configured order.
    pub fn enabled_datasets(&self) -> impl Iterator<Item = &DatasetSource> {
        self.datasets.iter().filter(|d| d.enabled)
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            cache_dir: defaults::cache_dir(),
            datasets: defaults::datasets(),
        }
    }
}

/// One downloadable reference dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSource {
    /// Short name, also the cached archive's file stem
    pub name: String,

    /// Archive URL (zip) or a local `.json` path
    pub url: String,

    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Rough size shown while loading
    #[serde(default)]
    pub expected_size: Option<String>,
}

/// Output artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination of the merged JSON array
    #[serde(default = "defaults::output_path")]
    pub path: PathBuf,

    /// Indent each record
    #[serde(default = "defaults::enabled")]
    pub pretty: bool,

    /// `fsync` after every record
    #[serde(default = "defaults::enabled")]
    pub sync_each_record: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: defaults::output_path(),
            pretty: true,
            sync_each_record: true,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::DatasetSource;

    // Registry defaults
    pub fn base_url() -> String {
        "https://dataportal.livsmedelsverket.se/livsmedel/api/v1".into()
    }
    pub fn page_limit() -> usize {
        2569
    }

    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; food-ingest/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_concurrent() -> usize {
        40
    }
    pub fn rate_limit_backoff() -> u64 {
        1000
    }

    // Batch defaults
    pub fn batch_size() -> usize {
        100
    }

    // Matching defaults
    pub fn threshold() -> f64 {
        70.0
    }

    pub fn enabled() -> bool {
        true
    }

    // Reference defaults
    pub fn cache_dir() -> PathBuf {
        PathBuf::from("cache")
    }
    pub fn datasets() -> Vec<DatasetSource> {
        vec![
            DatasetSource {
                name: "foundation".to_string(),
                url: "https://fdc.nal.usda.gov/fdc-datasets/FoodData_Central_foundation_food_json_2021-10-28.zip".to_string(),
                enabled: true,
                expected_size: Some("~340 foods".to_string()),
            },
            DatasetSource {
                name: "sr_legacy".to_string(),
                url: "https://fdc.nal.usda.gov/fdc-datasets/FoodData_Central_sr_legacy_food_json_2021-10-28.zip".to_string(),
                enabled: true,
                expected_size: Some("~7,700 foods".to_string()),
            },
            // ~1.2M items, 2.69 GB
            DatasetSource {
                name: "branded".to_string(),
                url: "https://fdc.nal.usda.gov/fdc-datasets/FoodData_Central_branded_food_json_2021-10-28.zip".to_string(),
                enabled: false,
                expected_size: Some("~1.2M foods".to_string()),
            },
        ]
    }

    // Output defaults
    pub fn output_path() -> PathBuf {
        PathBuf::from("merged_livsmedel_usda.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.fetch.max_concurrent, 40);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.batch.size, 100);
        assert_eq!(config.matching.threshold, 70.0);
        assert_eq!(config.reference.enabled_datasets().count(), 2);
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.fetch.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.fetch.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.matching.threshold = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_no_enabled_datasets() {
        let mut config = Config::default();
        for dataset in &mut config.reference.datasets {
            dataset.enabled = false;
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config: Config = toml::from_str(include_str!("../../config.toml")).unwrap();
        let defaults = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.registry.base_url, defaults.registry.base_url);
        assert_eq!(config.fetch.request_delay_ms, defaults.fetch.request_delay_ms);
        assert_eq!(config.output.path, defaults.output.path);
        assert_eq!(
            config.reference.enabled_datasets().map(|d| &d.name).collect::<Vec<_>>(),
            defaults.reference.enabled_datasets().map(|d| &d.name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [batch]
            size = 10

            [matching]
            threshold = 80.0
            "#,
        )
        .unwrap();

        assert_eq!(config.batch.size, 10);
        assert_eq!(config.matching.threshold, 80.0);
        assert_eq!(config.fetch.max_concurrent, 40);
        assert_eq!(config.reference.datasets.len(), 3);
    }
}
