//! End-to-end orchestration of one super-resolution run.
//!
//! One run is strictly sequential: decimate, chunk into batches, feed the
//! predictor one batch at a time, reassemble, trim. A batch the predictor
//! rejects is logged and skipped; the run only fails outright when no batch
//! at all survives.

use thiserror::Error;

use crate::audio::Waveform;
use crate::chunk::{batch_count, chunk_batches};
use crate::config::{ConfigError, PipelineConfig};
use crate::predict::{PredictError, Predictor};
use crate::reassemble::reassemble;
use crate::resample::{downsample, truncated_len};
use crate::InputError;

/// Progress of a run, in order. Used for log context and failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Loaded,
    Downsampled,
    Batched,
    Predicting,
    Reassembled,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Downsampled => "downsampled",
            Self::Batched => "batched",
            Self::Predicting => "predicting",
            Self::Reassembled => "reassembled",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input: {0}")]
    Input(#[from] InputError),
    #[error("all {0} batches aborted; no usable prediction output")]
    AllBatchesAborted(usize),
}

/// Everything downstream consumers need from one run: the reconstruction
/// plus the reference signals for comparison panels, and which batches (if
/// any) were dropped along the way.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Input truncated to a whole number of resampling groups; the length
    /// reference for the reconstruction.
    pub high_res: Waveform,
    pub low_res: Waveform,
    pub super_res: Waveform,
    pub batch_count: usize,
    pub aborted_batches: Vec<usize>,
}

/// Orchestrator for super-resolution runs over one predictor.
///
/// Construction validates the configuration and the predictor's output
/// geometry once; `run` can then be called any number of times.
pub struct Pipeline<'a> {
    config: PipelineConfig,
    predictor: &'a dyn Predictor,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, predictor: &'a dyn Predictor) -> Result<Self, ConfigError> {
        config.validate()?;
        config.validate_output_len(predictor.output_len())?;
        Ok(Self { config, predictor })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reconstruct `input` end to end.
    pub fn run(&self, input: &Waveform) -> Result<RunOutput, PipelineError> {
        let cfg = &self.config;
        let mut stage = Stage::Idle;
        tracing::debug!(stage = %stage, "run started");

        if input.is_empty() {
            tracing::error!(stage = %Stage::Failed, "empty input recording");
            return Err(InputError::EmptyRecording.into());
        }
        stage = Stage::Loaded;
        tracing::info!(
            stage = %stage,
            samples = input.len(),
            sample_rate_hz = input.sample_rate_hz,
            "recording loaded"
        );

        let target_len = truncated_len(input.len(), cfg.resampling_factor);
        let high_res = Waveform::new(input.samples[..target_len].to_vec(), input.sample_rate_hz);
        let low_samples = downsample(&input.samples, cfg.resampling_factor);
        let low_rate = (input.sample_rate_hz / cfg.resampling_factor as u32).max(1);
        stage = Stage::Downsampled;
        tracing::info!(
            stage = %stage,
            high_res_len = target_len,
            low_res_len = low_samples.len(),
            "decimated by {}",
            cfg.resampling_factor
        );

        let n_batches = batch_count(low_samples.len(), cfg.chunk_len, cfg.batch_size);
        stage = Stage::Batched;
        tracing::info!(stage = %stage, batches = n_batches, "chunked for prediction");

        stage = Stage::Predicting;
        let mut predicted = Vec::with_capacity(n_batches);
        let mut aborted_batches = Vec::new();
        for batch in chunk_batches(&low_samples, cfg.chunk_len, cfg.batch_size) {
            tracing::debug!(stage = %stage, batch = batch.index, "feeding batch to the predictor");
            match self.predictor.predict(&batch) {
                Ok(prediction) => predicted.push(prediction),
                Err(err @ PredictError::AbortedBatch { .. }) => {
                    tracing::warn!(stage = %stage, batch = batch.index, "{err}; skipping its span");
                    aborted_batches.push(batch.index);
                }
            }
        }

        if n_batches > 0 && predicted.is_empty() {
            tracing::error!(stage = %Stage::Failed, batches = n_batches, "every batch aborted");
            return Err(PipelineError::AllBatchesAborted(n_batches));
        }

        let samples = reassemble(
            &predicted,
            n_batches,
            cfg.batch_size,
            self.predictor.output_len(),
            target_len,
        );
        stage = Stage::Reassembled;
        tracing::info!(stage = %stage, output_len = samples.len(), "reassembled output");

        let output = RunOutput {
            high_res,
            low_res: Waveform::new(low_samples, low_rate),
            super_res: Waveform::new(samples, input.sample_rate_hz),
            batch_count: n_batches,
            aborted_batches,
        };
        tracing::info!(
            stage = %Stage::Done,
            aborted = output.aborted_batches.len(),
            "run complete"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, PipelineError};
    use crate::audio::Waveform;
    use crate::chunk::Batch;
    use crate::config::{ConfigError, PipelineConfig};
    use crate::predict::{check_batch_shape, PredictError, PredictionBatch, Predictor};
    use crate::InputError;

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            resampling_factor: 4,
            chunk_len: 4,
            batch_size: 2,
            sample_rate_hz: 48_000,
        }
    }

    /// Repeats each input sample `factor` times, optionally aborting a
    /// fixed set of batch indices.
    struct RepeatPredictor {
        chunk_len: usize,
        factor: usize,
        abort: Vec<usize>,
    }

    impl Predictor for RepeatPredictor {
        fn output_len(&self) -> usize {
            self.chunk_len * self.factor
        }

        fn predict(&self, batch: &Batch) -> Result<PredictionBatch, PredictError> {
            check_batch_shape(batch, self.chunk_len)?;
            if self.abort.contains(&batch.index) {
                return Err(PredictError::AbortedBatch {
                    index: batch.index,
                    chunk: 0,
                    got: 0,
                    expected: self.chunk_len,
                });
            }
            let chunks = batch
                .chunks
                .iter()
                .map(|c| {
                    c.iter()
                        .flat_map(|&v| std::iter::repeat(v).take(self.factor))
                        .collect()
                })
                .collect();
            Ok(PredictionBatch {
                index: batch.index,
                chunks,
            })
        }
    }

    #[test]
    fn output_length_tracks_the_high_res_reference() {
        let predictor = RepeatPredictor {
            chunk_len: 4,
            factor: 4,
            abort: vec![],
        };
        let pipeline = Pipeline::new(test_config(), &predictor).expect("pipeline");

        // 67 samples: truncated reference is 64, low-res is 16 -> one batch.
        let input = Waveform::new((0..67).map(|v| v as f32 * 0.001).collect(), 48_000);
        let out = pipeline.run(&input).expect("run");

        assert_eq!(out.high_res.len(), 64);
        assert_eq!(out.low_res.len(), 16);
        assert_eq!(out.low_res.sample_rate_hz, 12_000);
        assert_eq!(out.super_res.len(), 64);
        assert_eq!(out.super_res.sample_rate_hz, 48_000);
        assert_eq!(out.batch_count, 2);
        assert!(out.aborted_batches.is_empty());

        // The repeat predictor reconstructs a step-held version of the
        // decimated signal: sample t comes from low-res sample t / 4.
        for (t, &v) in out.super_res.samples.iter().enumerate() {
            let expect = out.low_res.samples[t / 4];
            assert_eq!(v, expect, "t={t}");
        }
    }

    #[test]
    fn aborted_batch_zeroes_only_its_span() {
        let predictor = RepeatPredictor {
            chunk_len: 4,
            factor: 4,
            abort: vec![1],
        };
        let pipeline = Pipeline::new(test_config(), &predictor).expect("pipeline");

        // Low-res length 24 -> 3 batches of 8 low-res samples each.
        let input = Waveform::new(vec![0.5; 96], 48_000);
        let out = pipeline.run(&input).expect("run");

        assert_eq!(out.batch_count, 3);
        assert_eq!(out.aborted_batches, vec![1]);
        assert_eq!(out.super_res.len(), 96);

        // Batch spans are 32 output samples wide.
        assert!(out.super_res.samples[..32].iter().all(|&v| v == 0.5));
        assert!(out.super_res.samples[32..64].iter().all(|&v| v == 0.0));
        assert!(out.super_res.samples[64..].iter().all(|&v| v == 0.5));
    }

    #[test]
    fn run_fails_when_every_batch_aborts() {
        let predictor = RepeatPredictor {
            chunk_len: 4,
            factor: 4,
            abort: vec![0, 1, 2],
        };
        let pipeline = Pipeline::new(test_config(), &predictor).expect("pipeline");

        let input = Waveform::new(vec![0.1; 96], 48_000);
        assert!(matches!(
            pipeline.run(&input),
            Err(PipelineError::AllBatchesAborted(3))
        ));
    }

    #[test]
    fn empty_input_is_an_input_error() {
        let predictor = RepeatPredictor {
            chunk_len: 4,
            factor: 4,
            abort: vec![],
        };
        let pipeline = Pipeline::new(test_config(), &predictor).expect("pipeline");
        assert!(matches!(
            pipeline.run(&Waveform::new(vec![], 48_000)),
            Err(PipelineError::Input(InputError::EmptyRecording))
        ));
    }

    #[test]
    fn mismatched_predictor_is_rejected_at_construction() {
        let predictor = RepeatPredictor {
            chunk_len: 4,
            factor: 2, // output_len 8, config expects 16
            abort: vec![],
        };
        assert!(matches!(
            Pipeline::new(test_config(), &predictor),
            Err(ConfigError::OutputLenMismatch { .. })
        ));
    }

    #[test]
    fn input_shorter_than_the_factor_reconstructs_to_empty() {
        let predictor = RepeatPredictor {
            chunk_len: 4,
            factor: 4,
            abort: vec![],
        };
        let pipeline = Pipeline::new(test_config(), &predictor).expect("pipeline");
        let out = pipeline
            .run(&Waveform::new(vec![0.1, 0.2, 0.3], 48_000))
            .expect("run");
        assert_eq!(out.high_res.len(), 0);
        assert_eq!(out.low_res.len(), 0);
        assert_eq!(out.super_res.len(), 0);
        assert_eq!(out.batch_count, 0);
    }
}
