//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.import.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "import.batch_size must be > 0".into(),
            ));
        }
        if self.thumbnail.cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnail.cache_capacity must be > 0".into(),
            ));
        }
        if self.thumbnail.max_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnail.max_dimension must be > 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.conversion.quality) {
            return Err(ConfigError::ValidationError(
                "conversion.quality must be between 0 and 100".into(),
            ));
        }
        if self.conversion.output_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "conversion.output_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}
