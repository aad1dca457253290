//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.processing.parallel_workers == 0, "processing.parallel_workers must be > 0"),
            (self.pipeline.buffer_size == 0, "pipeline.buffer_size must be > 0"),
            (self.limits.max_file_size_mb == 0, "limits.max_file_size_mb must be > 0"),
            (self.limits.max_image_dimension == 0, "limits.max_image_dimension must be > 0"),
            (self.limits.decode_timeout_ms == 0, "limits.decode_timeout_ms must be > 0"),
            (
                !(0.0..=1.0).contains(&self.classification.confidence),
                "classification.confidence must be between 0.0 and 1.0",
            ),
            (
                self.processing.supported_formats.is_empty(),
                "processing.supported_formats must not be empty",
            ),
            (
                !LOG_LEVELS.contains(&self.logging.level.as_str()),
                "logging.level must be one of error, warn, info, debug, trace",
            ),
            (
                !LOG_FORMATS.contains(&self.logging.format.as_str()),
                "logging.format must be pretty or json",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(ConfigError::ValidationError((*message).into())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_parallel_workers() {
        let mut config = Config::default();
        config.processing.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let mut config = Config::default();
        config.pipeline.buffer_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("buffer_size"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.decode_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("decode_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_invalid_confidence() {
        let mut config = Config::default();
        config.classification.confidence = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("confidence"));

        config.classification.confidence = -0.1;
        assert!(config.validate().is_err());

        config.classification.confidence = f64::NAN;
        assert!(config.validate().is_err());

        config.classification.confidence = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }
}
