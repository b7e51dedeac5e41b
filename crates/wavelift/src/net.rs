//! The demo predictor: a 1-D residual convolutional upsampler loaded from a
//! safetensors checkpoint.
//!
//! Architecture (all convolutions same-padded, stride 1):
//! - `input_conv`: 1 -> C channels, then ReLU
//! - `blocks.N`: conv0 / ReLU / conv1, plus the skip connection, then ReLU
//! - `output_conv`: C -> R channels, no activation
//! - sub-pixel interleave of the R channels, upsampling length by R
//!
//! C, R, the block count, and kernel sizes are all read from tensor shapes,
//! so the same loader serves any checkpoint of this family.

use std::path::Path;

use thiserror::Error;

use crate::chunk::Batch;
use crate::ops::{add_inplace, conv1d_same, pixel_shuffle1d, relu_inplace};
use crate::predict::{check_batch_shape, PredictError, PredictionBatch, Predictor};
use crate::weights::{Checkpoint, CheckpointError, TensorF32};

#[derive(Debug, Error)]
pub enum NetError {
    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("tensor {name} has shape {shape:?}, expected {expected}")]
    BadShape {
        name: String,
        shape: Vec<usize>,
        expected: String,
    },
    #[error("kernel of {name} must be odd, got {kernel}")]
    EvenKernel { name: String, kernel: usize },
    #[error("checkpoint has no residual blocks")]
    NoBlocks,
}

#[derive(Debug)]
struct Conv {
    weight: TensorF32,
    bias: TensorF32,
    channels_in: usize,
    channels_out: usize,
    kernel: usize,
}

#[derive(Debug)]
struct ResidualBlock {
    conv0: Conv,
    conv1: Conv,
}

/// A loaded, immutable residual upsampler.
#[derive(Debug)]
pub struct ResidualNet {
    chunk_len: usize,
    channels: usize,
    factor: usize,
    input_conv: Conv,
    blocks: Vec<ResidualBlock>,
    output_conv: Conv,
}

fn load_conv(
    ck: &Checkpoint,
    name: &str,
    channels_in: Option<usize>,
    channels_out: Option<usize>,
) -> Result<Conv, NetError> {
    let weight_name = format!("{name}.weight");
    let weight = ck.tensor(&weight_name)?;
    if weight.rank() != 3 {
        return Err(NetError::BadShape {
            name: weight_name,
            shape: weight.shape,
            expected: "[channels_out, channels_in, kernel]".to_string(),
        });
    }
    let (c_out, c_in, kernel) = (weight.shape[0], weight.shape[1], weight.shape[2]);
    if kernel % 2 == 0 || kernel == 0 {
        return Err(NetError::EvenKernel {
            name: weight_name,
            kernel,
        });
    }
    if channels_in.is_some_and(|c| c != c_in) || channels_out.is_some_and(|c| c != c_out) {
        return Err(NetError::BadShape {
            name: weight_name,
            shape: weight.shape,
            expected: format!("channels_in={channels_in:?} channels_out={channels_out:?}"),
        });
    }

    let bias_name = format!("{name}.bias");
    let bias = ck.tensor(&bias_name)?;
    if bias.shape != vec![c_out] {
        return Err(NetError::BadShape {
            name: bias_name,
            shape: bias.shape,
            expected: format!("[{c_out}]"),
        });
    }

    Ok(Conv {
        weight,
        bias,
        channels_in: c_in,
        channels_out: c_out,
        kernel,
    })
}

impl ResidualNet {
    /// Load a checkpoint and bind it to `chunk_len`-sample input chunks.
    ///
    /// Any structural problem with the tensors is fatal here, before a run
    /// ever starts.
    pub fn from_path(path: impl AsRef<Path>, chunk_len: usize) -> Result<Self, NetError> {
        let ck = Checkpoint::open(path)?;

        let input_conv = load_conv(&ck, "input_conv", Some(1), None)?;
        let channels = input_conv.channels_out;

        let mut blocks = Vec::new();
        while ck.contains(&format!("blocks.{}.conv0.weight", blocks.len())) {
            let prefix = format!("blocks.{}", blocks.len());
            let conv0 = load_conv(&ck, &format!("{prefix}.conv0"), Some(channels), Some(channels))?;
            let conv1 = load_conv(&ck, &format!("{prefix}.conv1"), Some(channels), Some(channels))?;
            blocks.push(ResidualBlock { conv0, conv1 });
        }
        if blocks.is_empty() {
            return Err(NetError::NoBlocks);
        }

        let output_conv = load_conv(&ck, "output_conv", Some(channels), None)?;
        let factor = output_conv.channels_out;

        tracing::debug!(
            channels,
            blocks = blocks.len(),
            factor,
            "loaded residual upsampler"
        );

        Ok(Self {
            chunk_len,
            channels,
            factor,
            input_conv,
            blocks,
            output_conv,
        })
    }

    /// Upsampling ratio the checkpoint was trained for.
    #[must_use]
    pub fn factor(&self) -> usize {
        self.factor
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn apply(conv: &Conv, input: &[f32], length: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; conv.channels_out * length];
        conv1d_same(
            &mut out,
            input,
            &conv.weight.data,
            Some(&conv.bias.data),
            conv.channels_in,
            conv.channels_out,
            length,
            conv.kernel,
        );
        out
    }

    /// Run one chunk through the network.
    fn forward(&self, chunk: &[f32]) -> Vec<f32> {
        let len = chunk.len();

        let mut h = Self::apply(&self.input_conv, chunk, len);
        relu_inplace(&mut h);

        for block in &self.blocks {
            let mut t = Self::apply(&block.conv0, &h, len);
            relu_inplace(&mut t);
            let mut t = Self::apply(&block.conv1, &t, len);
            add_inplace(&mut t, &h);
            relu_inplace(&mut t);
            h = t;
        }

        let out = Self::apply(&self.output_conv, &h, len);
        pixel_shuffle1d(&out, self.factor, len)
    }
}

impl Predictor for ResidualNet {
    fn output_len(&self) -> usize {
        self.chunk_len * self.factor
    }

    fn predict(&self, batch: &Batch) -> Result<PredictionBatch, PredictError> {
        check_batch_shape(batch, self.chunk_len)?;
        let chunks = batch.chunks.iter().map(|c| self.forward(c)).collect();
        Ok(PredictionBatch {
            index: batch.index,
            chunks,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use crate::weights::test_support::{write_checkpoint, RawTensor};

    /// Write a checkpoint whose forward pass repeats every input sample
    /// `factor` times, provided the input is non-negative (ReLU).
    ///
    /// input_conv copies the signal into channel 0, the residual blocks are
    /// zeroed (skip connection only), and every output channel taps
    /// channel 0 with an identity kernel.
    pub fn write_repeat_checkpoint(path: &Path, channels: usize, n_blocks: usize, factor: usize) {
        let mut tensors = Vec::new();

        let mut w_in = vec![0.0f32; channels * 3];
        w_in[1] = 1.0; // channel 0, kernel center
        tensors.push((
            "input_conv.weight".to_string(),
            RawTensor::f32(vec![channels, 1, 3], &w_in),
        ));
        tensors.push((
            "input_conv.bias".to_string(),
            RawTensor::f32(vec![channels], &vec![0.0; channels]),
        ));

        for i in 0..n_blocks {
            for conv in ["conv0", "conv1"] {
                tensors.push((
                    format!("blocks.{i}.{conv}.weight"),
                    RawTensor::f32(
                        vec![channels, channels, 3],
                        &vec![0.0; channels * channels * 3],
                    ),
                ));
                tensors.push((
                    format!("blocks.{i}.{conv}.bias"),
                    RawTensor::f32(vec![channels], &vec![0.0; channels]),
                ));
            }
        }

        let mut w_out = vec![0.0f32; factor * channels * 3];
        for r in 0..factor {
            w_out[(r * channels) * 3 + 1] = 1.0; // tap channel 0, kernel center
        }
        tensors.push((
            "output_conv.weight".to_string(),
            RawTensor::f32(vec![factor, channels, 3], &w_out),
        ));
        tensors.push((
            "output_conv.bias".to_string(),
            RawTensor::f32(vec![factor], &vec![0.0; factor]),
        ));

        write_checkpoint(path, tensors);
    }
}
