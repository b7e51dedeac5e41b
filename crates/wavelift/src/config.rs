//! Pipeline configuration: loaded once, validated once, then immutable.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{BATCH_SIZE, HIGH_RES_RATE_HZ, LOW_RES_DIM, RESAMPLING_FACTOR};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },
    #[error("sample_rate_hz {rate} is not divisible by resampling_factor {factor}")]
    RateNotDivisible { rate: u32, factor: usize },
    #[error("predictor emits {output_len}-sample chunks, expected chunk_len {chunk_len} * factor {factor}")]
    OutputLenMismatch {
        output_len: usize,
        chunk_len: usize,
        factor: usize,
    },
}

/// Geometry of one super-resolution run.
///
/// Every field has the demo default; a JSON config file may override any
/// subset. Validation happens in [`PipelineConfig::validate`], called by the
/// pipeline constructor, so a bad value is rejected before any run starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Integer decimation factor between the high-res and low-res signals.
    pub resampling_factor: usize,
    /// Samples per low-resolution model input chunk.
    pub chunk_len: usize,
    /// Chunks per predictor invocation.
    pub batch_size: usize,
    /// Sample rate expected of dataset recordings.
    pub sample_rate_hz: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resampling_factor: RESAMPLING_FACTOR,
            chunk_len: LOW_RES_DIM,
            batch_size: BATCH_SIZE,
            sample_rate_hz: HIGH_RES_RATE_HZ,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resampling_factor == 0 {
            return Err(ConfigError::NotPositive {
                field: "resampling_factor",
            });
        }
        if self.chunk_len == 0 {
            return Err(ConfigError::NotPositive { field: "chunk_len" });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::NotPositive { field: "batch_size" });
        }
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::NotPositive {
                field: "sample_rate_hz",
            });
        }
        if self.sample_rate_hz as usize % self.resampling_factor != 0 {
            return Err(ConfigError::RateNotDivisible {
                rate: self.sample_rate_hz,
                factor: self.resampling_factor,
            });
        }
        Ok(())
    }

    /// Check a predictor's fixed output chunk length against this geometry.
    pub fn validate_output_len(&self, output_len: usize) -> Result<(), ConfigError> {
        if output_len != self.chunk_len * self.resampling_factor {
            return Err(ConfigError::OutputLenMismatch {
                output_len,
                chunk_len: self.chunk_len,
                factor: self.resampling_factor,
            });
        }
        Ok(())
    }

    /// Sample rate of the decimated signal.
    #[must_use]
    pub fn low_res_rate_hz(&self) -> u32 {
        self.sample_rate_hz / self.resampling_factor as u32
    }

    /// Low-res samples consumed per predictor invocation.
    #[must_use]
    pub fn batch_stride(&self) -> usize {
        self.chunk_len * self.batch_size
    }

    /// Samples in one prediction output chunk.
    #[must_use]
    pub fn output_chunk_len(&self) -> usize {
        self.chunk_len * self.resampling_factor
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PipelineConfig};

    #[test]
    fn default_config_is_valid() {
        let cfg = PipelineConfig::default();
        cfg.validate().expect("default config");
        assert_eq!(cfg.low_res_rate_hz(), 12_000);
        assert_eq!(cfg.batch_stride(), 1_200 * 16);
        assert_eq!(cfg.output_chunk_len(), 4_800);
    }

    #[test]
    fn zero_fields_are_rejected() {
        let cfg = PipelineConfig {
            batch_size: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotPositive { field: "batch_size" })
        ));

        let cfg = PipelineConfig {
            resampling_factor: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NotPositive { .. })));
    }

    #[test]
    fn indivisible_rate_is_rejected() {
        let cfg = PipelineConfig {
            sample_rate_hz: 44_100,
            resampling_factor: 4,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RateNotDivisible { .. })
        ));
    }

    #[test]
    fn parse_overrides_subset() {
        let cfg = PipelineConfig::from_json_str(r#"{"chunk_len": 600, "resampling_factor": 2}"#)
            .expect("parse");
        assert_eq!(cfg.chunk_len, 600);
        assert_eq!(cfg.resampling_factor, 2);
        assert_eq!(cfg.batch_size, 16);
    }

    #[test]
    fn predictor_output_len_must_match() {
        let cfg = PipelineConfig::default();
        cfg.validate_output_len(4_800).expect("matching len");
        assert!(matches!(
            cfg.validate_output_len(1_200),
            Err(ConfigError::OutputLenMismatch { .. })
        ));
    }
}
