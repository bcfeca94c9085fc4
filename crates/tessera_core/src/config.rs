//! # Runtime Configuration
//!
//! Loaded once at startup, usually from a TOML file:
//!
//! ```toml
//! default_tick_rate = 60.0
//! thread_name_prefix = "sim"
//! worker_stack_size = 1048576
//! late_tick_warnings = false
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TesseraError, TesseraResult};
use crate::schedule::DEFAULT_TICK_RATE;

/// Settings shared by every system of a [`Runtime`](crate::Runtime).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Ticks per second for systems that do not declare a rate. Zero = uncapped.
    pub default_tick_rate: f64,
    /// Worker threads are named `<prefix>-<system name>`.
    pub thread_name_prefix: String,
    /// Stack size for worker threads. `None` keeps the platform default.
    pub worker_stack_size: Option<usize>,
    /// Emit a warning whenever a tick overruns its period.
    pub late_tick_warnings: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_tick_rate: DEFAULT_TICK_RATE,
            thread_name_prefix: "tessera-system".to_owned(),
            worker_stack_size: None,
            late_tick_warnings: true,
        }
    }
}

impl RuntimeConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::ConfigParse`] for malformed TOML and
    /// [`TesseraError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> TesseraResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> TesseraResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| TesseraError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "loaded runtime configuration");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> TesseraResult<()> {
        if self.default_tick_rate.is_nan() || self.default_tick_rate < 0.0 {
            return Err(TesseraError::InvalidConfig(format!(
                "default_tick_rate must be zero or positive, got {}",
                self.default_tick_rate
            )));
        }

        if self.thread_name_prefix.trim().is_empty() {
            return Err(TesseraError::InvalidConfig(
                "thread_name_prefix must not be empty".to_owned(),
            ));
        }

        if self.worker_stack_size == Some(0) {
            return Err(TesseraError::InvalidConfig(
                "worker_stack_size must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert!(config.late_tick_warnings);
    }

    #[test]
    fn test_partial_document() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            default_tick_rate = 30.0
            thread_name_prefix = "sim"
            "#,
        )
        .unwrap();

        assert!((config.default_tick_rate - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.thread_name_prefix, "sim");
        assert_eq!(config.worker_stack_size, None);
    }

    #[test]
    fn test_negative_rate_rejected() {
        let err = RuntimeConfig::from_toml_str("default_tick_rate = -5.0").unwrap_err();
        assert!(matches!(err, TesseraError::InvalidConfig(_)));
        assert!(err.to_string().contains("default_tick_rate"));
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let err = RuntimeConfig::from_toml_str(r#"thread_name_prefix = "  ""#).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_stack_rejected() {
        let err = RuntimeConfig::from_toml_str("worker_stack_size = 0").unwrap_err();
        assert!(matches!(err, TesseraError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = RuntimeConfig::from_toml_str("default_tick_rate = [").unwrap_err();
        assert!(matches!(err, TesseraError::ConfigParse(_)));

        let err = RuntimeConfig::from_toml_str("unknown_key = 1").unwrap_err();
        assert!(matches!(err, TesseraError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = RuntimeConfig::load("/nonexistent/tessera.toml").unwrap_err();
        assert!(matches!(err, TesseraError::Io { .. }));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = RuntimeConfig {
            default_tick_rate: 0.0,
            thread_name_prefix: "bench".to_owned(),
            worker_stack_size: Some(256 * 1024),
            late_tick_warnings: false,
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(RuntimeConfig::from_toml_str(&text).unwrap(), config);
    }
}
