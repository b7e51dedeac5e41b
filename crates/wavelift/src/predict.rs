//! The predictor boundary: one blocking call per fixed-shape batch.
//!
//! Implementations wrap whatever actually produces high-res chunks: the
//! checkpoint-backed network in [`crate::net`], or the spline baseline here.

use thiserror::Error;

use crate::chunk::Batch;
use crate::resample::upsample_spline;

/// Output of one predictor invocation; chunk order matches the input batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionBatch {
    pub index: usize,
    pub chunks: Vec<Vec<f32>>,
}

#[derive(Debug, Error)]
pub enum PredictError {
    /// The batch did not have the shape the model was built for. Recoverable:
    /// the orchestrator drops this batch's span and keeps going.
    #[error("aborted batch {index}: chunk {chunk} has {got} samples, expected {expected}")]
    AbortedBatch {
        index: usize,
        chunk: usize,
        got: usize,
        expected: usize,
    },
}

/// A model that maps a batch of fixed-size low-res chunks to a batch of
/// fixed-size high-res chunks.
///
/// One call per batch, strictly sequential; implementations are expected to
/// be immutable after construction so independent runs can share them.
pub trait Predictor {
    /// Samples in every output chunk.
    fn output_len(&self) -> usize;

    fn predict(&self, batch: &Batch) -> Result<PredictionBatch, PredictError>;
}

/// Reject any chunk whose length differs from `expected`.
///
/// Shared by predictor implementations; keeping the check in one place keeps
/// the abort classification consistent.
pub fn check_batch_shape(batch: &Batch, expected: usize) -> Result<(), PredictError> {
    for (i, chunk) in batch.chunks.iter().enumerate() {
        if chunk.len() != expected {
            return Err(PredictError::AbortedBatch {
                index: batch.index,
                chunk: i,
                got: chunk.len(),
                expected,
            });
        }
    }
    Ok(())
}

/// Cubic-spline interpolation standing in for the trained network.
///
/// Useful for judging how much the checkpoint actually adds over plain
/// interpolation, and for running the pipeline without weights on disk.
#[derive(Debug, Clone)]
pub struct SplineBaseline {
    chunk_len: usize,
    factor: usize,
}

impl SplineBaseline {
    #[must_use]
    pub fn new(chunk_len: usize, factor: usize) -> Self {
        Self { chunk_len, factor }
    }
}

impl Predictor for SplineBaseline {
    fn output_len(&self) -> usize {
        self.chunk_len * self.factor
    }

    fn predict(&self, batch: &Batch) -> Result<PredictionBatch, PredictError> {
        check_batch_shape(batch, self.chunk_len)?;
        let chunks = batch
            .chunks
            .iter()
            .map(|chunk| upsample_spline(chunk, self.factor))
            .collect();
        Ok(PredictionBatch {
            index: batch.index,
            chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{PredictError, Predictor, SplineBaseline};
    use crate::chunk::Batch;

    #[test]
    fn baseline_upsamples_each_chunk() {
        let p = SplineBaseline::new(4, 4);
        assert_eq!(p.output_len(), 16);

        let batch = Batch {
            index: 0,
            chunks: vec![vec![0.0, 4.0, 8.0, 12.0], vec![0.0; 4]],
        };
        let out = p.predict(&batch).expect("predict");
        assert_eq!(out.index, 0);
        assert_eq!(out.chunks.len(), 2);
        assert_eq!(out.chunks[0].len(), 16);
        // Linear input stays linear through the spline.
        for (j, &v) in out.chunks[0].iter().enumerate() {
            assert!((v - j as f32).abs() < 1e-4, "j={j} v={v}");
        }
        assert!(out.chunks[1].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn malformed_chunk_aborts_the_batch() {
        let p = SplineBaseline::new(4, 2);
        let batch = Batch {
            index: 3,
            chunks: vec![vec![0.0; 4], vec![0.0; 3]],
        };
        match p.predict(&batch) {
            Err(PredictError::AbortedBatch {
                index,
                chunk,
                got,
                expected,
            }) => {
                assert_eq!(index, 3);
                assert_eq!(chunk, 1);
                assert_eq!(got, 3);
                assert_eq!(expected, 4);
            }
            other => panic!("expected aborted batch, got {other:?}"),
        }
    }
}
