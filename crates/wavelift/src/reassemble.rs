//! Position-preserving reassembly of prediction batches.

use crate::predict::PredictionBatch;

/// Flatten prediction chunks into one signal and trim it to `target_len`.
///
/// The output buffer spans all `n_batches` batch positions; each present
/// batch is written at `index * batch_size * output_len`, so a batch the
/// orchestrator skipped leaves its span at zero without shifting later
/// batches. Excess tail samples (from chunk zero padding) are discarded by
/// the trim. `target_len` must not exceed the total span.
#[must_use]
pub fn reassemble(
    batches: &[PredictionBatch],
    n_batches: usize,
    batch_size: usize,
    output_len: usize,
    target_len: usize,
) -> Vec<f32> {
    let span = n_batches * batch_size * output_len;
    debug_assert!(target_len <= span);

    let mut out = vec![0.0f32; span];
    for batch in batches {
        debug_assert!(batch.index < n_batches);
        debug_assert_eq!(batch.chunks.len(), batch_size);
        let base = batch.index * batch_size * output_len;
        for (i, chunk) in batch.chunks.iter().enumerate() {
            debug_assert_eq!(chunk.len(), output_len);
            let start = base + i * output_len;
            out[start..start + output_len].copy_from_slice(chunk);
        }
    }

    out.truncate(target_len);
    out
}
