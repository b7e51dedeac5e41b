//! Mel power spectrograms for the diagnostic panels.
//!
//! Centered STFT (reflect-padded), periodic Hann window, Slaney-style mel
//! filter bank, and a decibel conversion relative to the signal's own peak.
//! FFT buffers are planned once per analyzer and reused across frames.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::constants::{HOP_LENGTH, MEL_BINS, N_FFT};

/// Mel power values, one row of `n_mels` bins per STFT frame.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub n_mels: usize,
    pub frames: usize,
    pub data: Vec<f32>,
}

impl Spectrogram {
    #[inline]
    #[must_use]
    pub fn value(&self, frame: usize, bin: usize) -> f32 {
        self.data[frame * self.n_mels + bin]
    }
}

/// Reusable mel analyzer bound to one sample rate.
pub struct MelAnalyzer {
    sample_rate_hz: u32,
    n_fft: usize,
    hop: usize,
    n_mels: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    filters: Vec<f32>, // [n_mels * n_freq]
    fft_buf: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
}

impl MelAnalyzer {
    #[must_use]
    pub fn new(sample_rate_hz: u32) -> Self {
        Self::with_params(sample_rate_hz, N_FFT, HOP_LENGTH, MEL_BINS)
    }

    #[must_use]
    pub fn with_params(sample_rate_hz: u32, n_fft: usize, hop: usize, n_mels: usize) -> Self {
        debug_assert!(n_fft > 0 && hop > 0 && n_mels > 0);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);
        let scratch_len = fft.get_inplace_scratch_len();

        // Periodic Hann (divides by N, not N-1), correct for overlapping frames.
        let window: Vec<f32> = (0..n_fft)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_fft as f32).cos()))
            .collect();

        let filters = build_mel_filters(sample_rate_hz, n_fft, n_mels);

        Self {
            sample_rate_hz,
            n_fft,
            hop,
            n_mels,
            fft,
            window,
            filters,
            fft_buf: vec![Complex::new(0.0, 0.0); n_fft],
            fft_scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    #[must_use]
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Compute the mel power spectrogram of `samples`.
    ///
    /// Frames are centered: the signal is reflect-padded by `n_fft / 2` on
    /// both sides, so a signal of length L yields `L / hop + 1` frames.
    pub fn compute(&mut self, samples: &[f32]) -> Spectrogram {
        let padded = reflect_pad(samples, self.n_fft / 2);
        let n_freq = self.n_fft / 2 + 1;

        let frames = if padded.len() >= self.n_fft {
            (padded.len() - self.n_fft) / self.hop + 1
        } else {
            0
        };

        let mut data = vec![0.0f32; frames * self.n_mels];
        let mut power = vec![0.0f32; n_freq];

        for t in 0..frames {
            let start = t * self.hop;
            for (i, slot) in self.fft_buf.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.fft
                .process_with_scratch(&mut self.fft_buf, &mut self.fft_scratch);

            for (k, p) in power.iter_mut().enumerate() {
                let c = self.fft_buf[k];
                *p = c.re * c.re + c.im * c.im;
            }

            let row = &mut data[t * self.n_mels..(t + 1) * self.n_mels];
            for (m, out) in row.iter_mut().enumerate() {
                let filt = &self.filters[m * n_freq..(m + 1) * n_freq];
                let mut sum = 0.0f32;
                for k in 0..n_freq {
                    sum += filt[k] * power[k];
                }
                *out = sum;
            }
        }

        Spectrogram {
            n_mels: self.n_mels,
            frames,
            data,
        }
    }
}

/// Convert power values to decibels relative to their own maximum, clamped
/// to a `top_db` floor. After conversion every value lies in `[-top_db, 0]`.
pub fn power_to_db(data: &mut [f32], top_db: f32) {
    const AMIN: f32 = 1e-10;
    let ref_power = data.iter().copied().fold(AMIN, f32::max);
    let ref_db = 10.0 * ref_power.log10();
    for v in data.iter_mut() {
        let db = 10.0 * v.max(AMIN).log10() - ref_db;
        *v = db.max(-top_db);
    }
}

/// Reflect-pad `pad` samples on both sides, mirroring around the first and
/// last samples (which are not repeated). Indices past the available data
/// fall back to zero, so short signals still pad to a fixed length.
fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let len = samples.len();
    let mut out = Vec::with_capacity(len + 2 * pad);
    for j in (1..=pad).rev() {
        out.push(samples.get(j).copied().unwrap_or(0.0));
    }
    out.extend_from_slice(samples);
    for j in 1..=pad {
        let v = if j < len { samples[len - 1 - j] } else { 0.0 };
        out.push(v);
    }
    out
}

#[inline]
fn hertz_to_mel(freq: f32) -> f32 {
    // Slaney-style mel scale: linear below 1 kHz, logarithmic above.
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = 15.0;
    // ln(6.4) / 27
    const LOGSTEP: f32 = 0.068_751_78;

    if freq >= MIN_LOG_HZ {
        MIN_LOG_MEL + (freq / MIN_LOG_HZ).ln() / LOGSTEP
    } else {
        3.0 * freq / 200.0
    }
}

#[inline]
fn mel_to_hertz(mels: f32) -> f32 {
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = 15.0;
    const LOGSTEP: f32 = 0.068_751_78;

    if mels >= MIN_LOG_MEL {
        MIN_LOG_HZ * (LOGSTEP * (mels - MIN_LOG_MEL)).exp()
    } else {
        200.0 * mels / 3.0
    }
}

/// Triangular Slaney mel filter bank, `[n_mels * n_freq]` row-major, with
/// the 2/bandwidth area normalization.
fn build_mel_filters(sample_rate_hz: u32, n_fft: usize, n_mels: usize) -> Vec<f32> {
    let n_freq = n_fft / 2 + 1;

    let mut fft_freqs = vec![0.0f32; n_freq];
    for (f, v) in fft_freqs.iter_mut().enumerate() {
        *v = (f as f32) * (sample_rate_hz as f32) / (n_fft as f32);
    }

    let mel_min = hertz_to_mel(0.0);
    let mel_max = hertz_to_mel((sample_rate_hz as f32) / 2.0);

    let mut filter_freqs = vec![0.0f32; n_mels + 2];
    for (i, v) in filter_freqs.iter_mut().enumerate() {
        let mel = mel_min + (mel_max - mel_min) * (i as f32) / ((n_mels + 1) as f32);
        *v = mel_to_hertz(mel);
    }

    let mut filter_diff = vec![0.0f32; n_mels + 1];
    for (i, v) in filter_diff.iter_mut().enumerate() {
        *v = filter_freqs[i + 1] - filter_freqs[i];
        if *v == 0.0 {
            *v = 1e-6;
        }
    }

    let mut filters = vec![0.0f32; n_mels * n_freq];
    for m in 0..n_mels {
        let denom = filter_freqs[m + 2] - filter_freqs[m];
        let enorm = 2.0 / denom;
        for f in 0..n_freq {
            let down = (fft_freqs[f] - filter_freqs[m]) / filter_diff[m];
            let up = (filter_freqs[m + 2] - fft_freqs[f]) / filter_diff[m + 1];
            let val = down.min(up).max(0.0);
            filters[m * n_freq + f] = val * enorm;
        }
    }

    filters
}
