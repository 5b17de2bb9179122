//! Configuration file: storage settings and directory mappings.
//!
//! The file is TOML. Lookup order is an explicit path, then
//! `$BUCKETDIFF_CONFIG`, then `<config dir>/bucketdiff/config.toml`.

use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;
use crate::inventory::{ExcludePatterns, ReportingZone, DEFAULT_PAGE_SIZE, DEFAULT_UTC_OFFSET_MINUTES};
use crate::reconcile::ScanBoundary;
use crate::storage::S3Provider;

pub const CONFIG_ENV_VAR: &str = "BUCKETDIFF_CONFIG";
const APP_DIR: &str = "bucketdiff";
const CONFIG_FILE: &str = "config.toml";

/// Largest page the S3 ListObjectsV2 API hands out.
pub const MAX_PAGE_SIZE: usize = 1000;

fn default_utc_offset_minutes() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_jobs() -> usize {
    1
}

/// Serialized form of [`ScanBoundary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundarySetting {
    #[default]
    DrainTails,
    StopAtExhaustion,
}

impl From<BoundarySetting> for ScanBoundary {
    fn from(setting: BoundarySetting) -> Self {
        match setting {
            BoundarySetting::DrainTails => ScanBoundary::DrainTails,
            BoundarySetting::StopAtExhaustion => ScanBoundary::StopAtExhaustion,
        }
    }
}

/// Connection settings shared by every mapping.
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    #[serde(default)]
    pub provider: S3Provider,
    #[serde(default)]
    pub region: Option<String>,
    /// Overrides the provider's default endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("provider", &self.provider)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One local directory bound to one bucket.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryMapping {
    pub bucket: String,
    pub local_root: PathBuf,
    #[serde(default)]
    logical_prefix: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl DirectoryMapping {
    pub fn new(bucket: impl Into<String>, local_root: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            local_root: local_root.into(),
            logical_prefix: None,
            name: None,
            exclude: Vec::new(),
        }
    }

    pub fn with_logical_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.logical_prefix = Some(prefix.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_exclude(mut self, patterns: &[&str]) -> Self {
        self.exclude = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Prefix local paths take on in place of the local root; the bucket name
    /// unless configured otherwise.
    pub fn logical_prefix(&self) -> &str {
        self.logical_prefix.as_deref().unwrap_or(&self.bucket)
    }

    /// Name used in reports and for `--mapping`.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.logical_prefix())
    }

    pub fn excludes(&self) -> Result<ExcludePatterns, ConfigurationError> {
        ExcludePatterns::from_patterns(self.exclude.as_slice()).map_err(|e| ConfigurationError::InvalidPattern {
            mapping: self.name().to_string(),
            pattern: e.glob().unwrap_or_default().to_string(),
            message: e.kind().to_string(),
        })
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub scan_boundary: BoundarySetting,
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default, rename = "mapping")]
    pub mappings: Vec<DirectoryMapping>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            page_size: default_page_size(),
            scan_boundary: BoundarySetting::default(),
            fail_fast: false,
            jobs: default_jobs(),
            storage: StorageSettings::default(),
            mappings: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text without validating it.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigurationError> {
        toml::from_str(text).map_err(|source| ConfigurationError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigurationError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigurationError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let config = Self::from_toml(&text, path)?;
        config.validate()?;

        tracing::info!(
            path = %path.display(),
            mappings = config.mappings.len(),
            "Loaded config"
        );
        tracing::debug!(?config, "Config loaded (full debug)");
        Ok(config)
    }

    /// Resolve where the configuration lives.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigurationError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigurationError::NoConfigDir)
    }

    pub fn reporting_zone(&self) -> Result<ReportingZone, ConfigurationError> {
        ReportingZone::from_minutes(self.utc_offset_minutes).ok_or_else(|| ConfigurationError::Invalid {
            message: format!(
                "utc_offset_minutes must be within ±1439, got {}",
                self.utc_offset_minutes
            ),
        })
    }

    pub fn scan_boundary(&self) -> ScanBoundary {
        self.scan_boundary.into()
    }

    /// Check everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.reporting_zone()?;

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigurationError::Invalid {
                message: format!("page_size must be in 1..={}, got {}", MAX_PAGE_SIZE, self.page_size),
            });
        }
        if self.jobs == 0 {
            return Err(ConfigurationError::Invalid {
                message: "jobs must be at least 1".to_string(),
            });
        }

        self.validate_storage()?;

        if self.mappings.is_empty() {
            return Err(ConfigurationError::NoMappings);
        }

        let mut names = HashSet::new();
        for (index, mapping) in self.mappings.iter().enumerate() {
            let index = index + 1;
            if mapping.bucket.trim().is_empty() {
                return Err(ConfigurationError::InvalidMapping {
                    index,
                    message: "bucket is empty".to_string(),
                });
            }
            if mapping.bucket.contains('/') {
                return Err(ConfigurationError::InvalidMapping {
                    index,
                    message: format!("bucket '{}' must not contain '/'", mapping.bucket),
                });
            }
            if mapping.local_root.as_os_str().is_empty() {
                return Err(ConfigurationError::InvalidMapping {
                    index,
                    message: "local_root is empty".to_string(),
                });
            }
            if !mapping.local_root.is_dir() {
                return Err(ConfigurationError::LocalRootMissing {
                    mapping: mapping.name().to_string(),
                    path: mapping.local_root.clone(),
                });
            }
            if !names.insert(mapping.name()) {
                return Err(ConfigurationError::DuplicateName {
                    name: mapping.name().to_string(),
                });
            }
            mapping.excludes()?;
        }

        Ok(())
    }

    fn validate_storage(&self) -> Result<(), ConfigurationError> {
        let storage = &self.storage;
        if storage.provider == S3Provider::Custom && storage.endpoint.is_none() {
            return Err(ConfigurationError::Storage {
                message: "provider \"custom\" needs an endpoint".to_string(),
            });
        }
        if storage.access_key_id.is_some() != storage.secret_access_key.is_some() {
            return Err(ConfigurationError::Storage {
                message: "access_key_id and secret_access_key must be given together".to_string(),
            });
        }
        Ok(())
    }

    /// Mappings selected by name, in configuration order; all when `names` is empty.
    pub fn select_mappings(&self, names: &[String]) -> Result<Vec<DirectoryMapping>, ConfigurationError> {
        if names.is_empty() {
            return Ok(self.mappings.clone());
        }

        for name in names {
            if !self.mappings.iter().any(|m| m.name() == name) {
                let known = self
                    .mappings
                    .iter()
                    .map(|m| m.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(ConfigurationError::UnknownMapping {
                    name: name.clone(),
                    known,
                });
            }
        }

        Ok(self
            .mappings
            .iter()
            .filter(|m| names.iter().any(|n| n == m.name()))
            .cloned()
            .collect())
    }

    /// Distinct buckets across all mappings, in first-seen order.
    pub fn buckets(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.mappings
            .iter()
            .map(|m| m.bucket.as_str())
            .filter(|b| seen.insert(*b))
            .collect()
    }
}
