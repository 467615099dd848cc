//! Engine configuration
//!
//! Loaded from JSON. Every field is optional; missing fields take defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::source::{
    validate_chunk_size, validate_queue_size, DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_SIZE,
};
use crate::error::{AudioError, Result};

/// Default pause between background refill cycles
pub const DEFAULT_REFILL_INTERVAL_MS: u64 = 50;

/// Auxiliary sends requested per source at startup
pub const DEFAULT_AUXILIARY_SENDS: usize = 4;

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output device name; `None` selects the backend's default
    pub device: Option<String>,
    /// Milliseconds between background refill cycles
    pub refill_interval_ms: u64,
    /// Queue size given to new sources
    pub default_queue_size: usize,
    /// Chunk size given to new sources
    pub default_chunk_size: usize,
    /// Auxiliary sends requested per source
    pub auxiliary_sends: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: None,
            refill_interval_ms: DEFAULT_REFILL_INTERVAL_MS,
            default_queue_size: DEFAULT_QUEUE_SIZE,
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            auxiliary_sends: DEFAULT_AUXILIARY_SENDS,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    ///
    /// # Example
    /// ```
    /// use resonar::EngineConfig;
    /// let config = EngineConfig::from_json_str(r#"{"default_queue_size": 8}"#).unwrap();
    /// assert_eq!(config.default_queue_size, 8);
    /// assert_eq!(config.refill_interval_ms, 50);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AudioError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check every field; the chunk size is rounded down to its quantum
    pub fn validate(&mut self) -> Result<()> {
        if self.refill_interval_ms == 0 {
            return Err(AudioError::invalid_parameter(
                "refill_interval_ms",
                self.refill_interval_ms,
                "at least 1",
            ));
        }
        if self.auxiliary_sends == 0 {
            return Err(AudioError::invalid_parameter(
                "auxiliary_sends",
                self.auxiliary_sends,
                "at least 1",
            ));
        }
        self.default_queue_size = validate_queue_size(to_i64(self.default_queue_size))?;
        self.default_chunk_size = validate_chunk_size(to_i64(self.default_chunk_size))?;
        Ok(())
    }

    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_chunk_size_is_rounded() {
        let config = EngineConfig::from_json_str(r#"{"default_chunk_size": 32768}"#).unwrap();
        assert_eq!(config.default_chunk_size, 27648);
    }

    #[test]
    fn test_out_of_range_values_fail() {
        assert!(EngineConfig::from_json_str(r#"{"default_queue_size": 64}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"default_chunk_size": 100}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"refill_interval_ms": 0}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"auxiliary_sends": 0}"#).is_err());
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"device": "Resonar Software Mixer", "refill_interval_ms": 10}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.device.as_deref(), Some("Resonar Software Mixer"));
        assert_eq!(config.refill_interval(), Duration::from_millis(10));

        assert!(EngineConfig::load("/nonexistent/resonar.json").is_err());
    }
}
