//! Signal-processing constants for the demo configuration.

// Recording format (VCTK-style speech corpus).
pub const HIGH_RES_RATE_HZ: u32 = 48_000;
pub const RESAMPLING_FACTOR: usize = 4;
pub const LOW_RES_RATE_HZ: u32 = 12_000;

// Model chunk geometry.
pub const LOW_RES_DIM: usize = 1_200;
pub const SAMPLE_DIM: usize = 4_800; // LOW_RES_DIM * RESAMPLING_FACTOR
pub const BATCH_SIZE: usize = 16;

// Spectrogram analysis.
pub const MEL_BINS: usize = 128;
pub const N_FFT: usize = 2_048;
pub const HOP_LENGTH: usize = 512;
pub const TOP_DB: f32 = 80.0;
