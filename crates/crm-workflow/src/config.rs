//! Pipeline configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! id_allocation_retries = 5
//! id_retry_backoff_ms = 10
//!
//! [aging_thresholds]
//! fresh_max_hours = 6
//! warm_max_hours = 12
//! stale_max_hours = 24
//! ```

use crate::error::ConfigError;
use crm_core::AgingThresholds;
use crm_store::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Retries after a counter conflict before ID allocation fails
    pub id_allocation_retries: u32,
    /// First retry delay; doubles per retry
    pub id_retry_backoff_ms: u64,
    /// ALSC severity bands
    pub aging_thresholds: AgingThresholds,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_id_allocation_retries(mut self, retries: u32) -> Self {
        self.id_allocation_retries = retries;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_id_retry_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.id_retry_backoff_ms = backoff_ms;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_aging_thresholds(mut self, thresholds: AgingThresholds) -> Self {
        self.aging_thresholds = thresholds;
        self
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the aging bands are ordered
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.aging_thresholds;
        if t.fresh_max_hours < 0
            || t.fresh_max_hours > t.warm_max_hours
            || t.warm_max_hours > t.stale_max_hours
        {
            return Err(ConfigError::Invalid(format!(
                "aging thresholds must be non-negative and ascending, got {}/{}/{}",
                t.fresh_max_hours, t.warm_max_hours, t.stale_max_hours
            )));
        }
        Ok(())
    }

    /// Counter retry behaviour for the ID generator
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.id_allocation_retries,
            backoff_ms: self.id_retry_backoff_ms,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            id_allocation_retries: retry.max_retries,
            id_retry_backoff_ms: retry.backoff_ms,
            aging_thresholds: AgingThresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(PipelineConfig::from_toml_str("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = PipelineConfig::from_toml_str(
            "id_allocation_retries = 2\n\n[aging_thresholds]\nfresh_max_hours = 1\nwarm_max_hours = 2\nstale_max_hours = 48\n",
        )
        .unwrap();
        assert_eq!(config.id_allocation_retries, 2);
        assert_eq!(config.id_retry_backoff_ms, 10);
        assert_eq!(config.aging_thresholds.stale_max_hours, 48);
        assert_eq!(config.retry_policy().max_retries, 2);
    }

    #[test]
    fn unordered_bands_rejected() {
        let err = PipelineConfig::from_toml_str(
            "[aging_thresholds]\nfresh_max_hours = 12\nwarm_max_hours = 6\nstale_max_hours = 24\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("id_allocation_retries = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id_retry_backoff_ms = 25").unwrap();
        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.id_retry_backoff_ms, 25);

        let missing = PipelineConfig::from_file(file.path().with_extension("absent"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
