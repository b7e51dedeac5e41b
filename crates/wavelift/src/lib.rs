//! Speech audio super-resolution pipeline and diagnostics.
//!
//! This crate provides:
//! - decimation and batch-aligned chunking of a recording
//! - a checkpoint-backed residual upsampler plus a spline baseline
//! - position-preserving reassembly back to the reference length
//! - diagnostic artifacts (WAV files, spectrogram panels, zip bundle)

pub mod artifact;
pub mod audio;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod net;
pub mod ops;
pub mod pipeline;
pub mod predict;
pub mod reassemble;
pub mod resample;
pub mod spectrogram;
pub mod upload;
pub mod weights;

use thiserror::Error;

/// Failure to obtain a usable input recording, from any source.
///
/// A run hit by one of these never reaches the predictor.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("recording index {index} out of range ({count} recordings available)")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("wav decode: {0}")]
    Wav(#[from] audio::WavError),
    #[error("upload json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("upload payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("upload payload has no base64 data marker")]
    MissingBase64Marker,
    #[error("recording is empty")]
    EmptyRecording,
}
