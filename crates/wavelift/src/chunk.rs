//! Batch-aligned chunking of the low-resolution signal.
//!
//! The predictor only ever sees full batches of full chunks, so the final
//! stretch of a waveform is right-padded with zeros and there is no
//! short-batch special case anywhere downstream.

/// One predictor invocation's worth of input chunks.
///
/// `index` is the batch's position in production order; the reassembler uses
/// it to place (or leave zeroed) the batch's span in the output signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub index: usize,
    pub chunks: Vec<Vec<f32>>,
}

/// Lazy iterator of batches covering `samples` left to right.
///
/// Stateless with respect to the input: iterating twice over the same
/// samples yields identical batches.
#[derive(Debug, Clone)]
pub struct BatchIter<'a> {
    samples: &'a [f32],
    chunk_len: usize,
    batch_size: usize,
    next_start: usize,
    next_index: usize,
}

/// Split `samples` into batches of `batch_size` chunks of `chunk_len`
/// samples each, zero-padding past the end of the signal.
///
/// `chunk_len` and `batch_size` must be positive (validated at
/// configuration time).
#[must_use]
pub fn chunk_batches(samples: &[f32], chunk_len: usize, batch_size: usize) -> BatchIter<'_> {
    debug_assert!(chunk_len > 0 && batch_size > 0);
    BatchIter {
        samples,
        chunk_len,
        batch_size,
        next_start: 0,
        next_index: 0,
    }
}

/// Number of batches [`chunk_batches`] will produce for a signal of `len`
/// samples.
#[must_use]
pub fn batch_count(len: usize, chunk_len: usize, batch_size: usize) -> usize {
    debug_assert!(chunk_len > 0 && batch_size > 0);
    len.div_ceil(chunk_len * batch_size)
}

impl Iterator for BatchIter<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.next_start >= self.samples.len() {
            return None;
        }

        let mut chunks = Vec::with_capacity(self.batch_size);
        for i in 0..self.batch_size {
            let start = self.next_start + i * self.chunk_len;
            chunks.push(padded_chunk(self.samples, start, self.chunk_len));
        }

        let batch = Batch {
            index: self.next_index,
            chunks,
        };
        self.next_start += self.chunk_len * self.batch_size;
        self.next_index += 1;
        Some(batch)
    }
}

/// Copy `[start, start + chunk_len)` out of `samples`, right-padding with
/// zeros where the range runs past the end. A range entirely past the end
/// yields an all-zero chunk.
fn padded_chunk(samples: &[f32], start: usize, chunk_len: usize) -> Vec<f32> {
    let mut chunk = vec![0.0f32; chunk_len];
    if start < samples.len() {
        let end = (start + chunk_len).min(samples.len());
        chunk[..end - start].copy_from_slice(&samples[start..end]);
    }
    chunk
}

#[cfg(test)]
mod tests {
    use super::{batch_count, chunk_batches};

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|v| v as f32 + 1.0).collect()
    }

    #[test]
    fn exact_multiple_has_no_padding() {
        let w = ramp(4 * 2 * 3);
        let batches: Vec<_> = chunk_batches(&w, 4, 2).collect();
        assert_eq!(batches.len(), 3);
        let flat: Vec<f32> = batches
            .iter()
            .flat_map(|b| b.chunks.iter().flatten().copied())
            .collect();
        assert_eq!(flat, w);
    }

    #[test]
    fn partial_final_chunk_is_zero_padded() {
        // chunk_len=4, batch_size=2, len=6: one batch of [w0..w3], [w4,w5,0,0].
        let w = ramp(6);
        let batches: Vec<_> = chunk_batches(&w, 4, 2).collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].chunks[0], vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(batches[0].chunks[1], vec![5.0, 6.0, 0.0, 0.0]);
    }

    #[test]
    fn one_sample_overflow_pads_exactly_one_chunk() {
        let chunk_len = 4;
        let batch_size = 2;
        let w = ramp(chunk_len * batch_size + 1);
        let batches: Vec<_> = chunk_batches(&w, chunk_len, batch_size).collect();
        assert_eq!(batches.len(), 2);

        // Second batch: first chunk carries the one leftover sample, the
        // rest of the batch is entirely zeros.
        assert_eq!(batches[1].chunks[0], vec![9.0, 0.0, 0.0, 0.0]);
        assert_eq!(batches[1].chunks[1], vec![0.0; 4]);
    }

    #[test]
    fn concatenation_covers_the_signal_exactly() {
        for len in 1..60usize {
            let w = ramp(len);
            let flat: Vec<f32> = chunk_batches(&w, 5, 3)
                .flat_map(|b| b.chunks.into_iter().flatten())
                .collect();
            assert!(flat.len() >= len);
            assert_eq!(&flat[..len], &w[..], "len={len}");
            assert!(flat[len..].iter().all(|&v| v == 0.0), "len={len}");
        }
    }

    #[test]
    fn iteration_is_restartable() {
        let w = ramp(23);
        let it = chunk_batches(&w, 4, 2);
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_signal_yields_no_batches() {
        assert_eq!(chunk_batches(&[], 4, 2).count(), 0);
    }

    #[test]
    fn batch_count_matches_iterator() {
        for len in 0..100usize {
            let w = ramp(len);
            assert_eq!(
                chunk_batches(&w, 4, 3).count(),
                batch_count(len, 4, 3),
                "len={len}"
            );
        }
    }

    #[test]
    fn batch_indices_are_sequential() {
        let w = ramp(50);
        for (i, b) in chunk_batches(&w, 4, 2).enumerate() {
            assert_eq!(b.index, i);
        }
    }
}
