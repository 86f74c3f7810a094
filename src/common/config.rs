//! Configuration for a volume pool

use crate::common::utils::parse_duration;
use crate::common::{Error, Result};
use crate::volume::VolumeStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "VOLKEEPER";

/// Pool-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Whether disk space probing is enabled at all
    #[serde(default = "default_disk_space_checking")]
    pub disk_space_checking: bool,

    /// Margin at which an operator warning is logged
    #[serde(default = "default_warn_bytes")]
    pub disk_space_warn_bytes: u64,

    /// Margin at which writes are denied
    #[serde(default = "default_threshold_bytes")]
    pub disk_space_threshold_bytes: u64,

    /// Interval between space refreshes in watch mode (e.g. "30s", "5m")
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Configured volumes, in configuration order
    #[serde(default)]
    pub volumes: Vec<VolumeEntry>,
}

fn default_disk_space_checking() -> bool {
    true
}
fn default_warn_bytes() -> u64 {
    50 * 1024 * 1024
}
fn default_threshold_bytes() -> u64 {
    20 * 1024 * 1024
}
fn default_refresh_interval() -> String {
    "5m".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

/// One configured volume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeEntry {
    /// Persisted identity; volumes without one use their creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Archive/store directory
    pub path: String,

    /// Search-index directory
    pub index_path: String,

    /// Capacity ceiling in megabytes
    pub max_size_mb: u64,

    /// Persisted lifecycle state (restored without transition checks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VolumeStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            disk_space_checking: default_disk_space_checking(),
            disk_space_warn_bytes: default_warn_bytes(),
            disk_space_threshold_bytes: default_threshold_bytes(),
            refresh_interval: default_refresh_interval(),
            log_level: default_log_level(),
            volumes: Vec::new(),
        }
    }
}

impl PoolConfig {
    /// Load from an optional TOML file, then apply `VOLKEEPER_*` overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let config: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for entry in &self.volumes {
            if entry.max_size_mb == 0 {
                return Err(Error::InvalidConfig(format!(
                    "volume {} must have a positive max_size_mb",
                    entry.path
                )));
            }
            if entry.path.trim().is_empty() || entry.index_path.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "volume path and index_path cannot be empty".into(),
                ));
            }
        }

        self.refresh_interval()?;

        if self.disk_space_threshold_bytes > self.disk_space_warn_bytes {
            tracing::warn!(
                "disk space threshold ({} bytes) exceeds warn margin ({} bytes); writes may be denied without a prior warning",
                self.disk_space_threshold_bytes,
                self.disk_space_warn_bytes
            );
        }

        Ok(())
    }

    pub fn refresh_interval(&self) -> Result<Duration> {
        parse_duration(&self.refresh_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::from_toml_str("").unwrap();
        assert!(config.disk_space_checking);
        assert_eq!(config.disk_space_warn_bytes, 50 * 1024 * 1024);
        assert_eq!(config.disk_space_threshold_bytes, 20 * 1024 * 1024);
        assert_eq!(config.refresh_interval().unwrap(), Duration::from_secs(300));
        assert!(config.volumes.is_empty());
    }

    #[test]
    fn test_parse_volumes() {
        let config = PoolConfig::from_toml_str(
            r#"
            disk_space_checking = false
            disk_space_warn_bytes = 1048576
            disk_space_threshold_bytes = 524288

            [[volumes]]
            path = "/archive/vol1/store"
            index_path = "/archive/vol1/index"
            max_size_mb = 3000

            [[volumes]]
            id = "vol-2"
            path = "/archive/vol2/store"
            index_path = "/archive/vol2/index"
            max_size_mb = 500
            status = "closed"
            modified = "2024-01-02T03:04:05Z"
            "#,
        )
        .unwrap();

        assert!(!config.disk_space_checking);
        assert_eq!(config.volumes.len(), 2);
        assert_eq!(config.volumes[0].id, None);
        assert_eq!(config.volumes[1].id.as_deref(), Some("vol-2"));
        assert_eq!(config.volumes[1].status, Some(VolumeStatus::Closed));
        assert!(config.volumes[1].modified.is_some());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = PoolConfig::from_toml_str(
            r#"
            [[volumes]]
            path = "/archive/store"
            index_path = "/archive/index"
            max_size_mb = 0
            "#,
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_interval() {
        let result = PoolConfig::from_toml_str(r#"refresh_interval = "soon""#);
        assert!(result.is_err());
    }
}
