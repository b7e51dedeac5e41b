//! Diagnostic artifact output: WAV files, a three-panel spectrogram image,
//! and a zip bundle of everything.
//!
//! The zip bytes are also returned in memory so a caller that answers a
//! request can hand them straight back without re-reading the file.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audio::{sample_to_i16, Waveform};
use crate::constants::TOP_DB;
use crate::pipeline::RunOutput;
use crate::spectrogram::{power_to_db, MelAnalyzer, Spectrogram};

const PANEL_WIDTH: u32 = 960;
const PANEL_HEIGHT: u32 = 256;
const PANEL_GAP: u32 = 12;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wav write: {0}")]
    Wav(#[from] hound::Error),
    #[error("image write: {0}")]
    Image(#[from] image::ImageError),
    #[error("zip write: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Paths of everything one run produced, plus the zip body.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub high_res_wav: PathBuf,
    pub low_res_wav: PathBuf,
    pub super_res_wav: PathBuf,
    pub spectrogram_png: PathBuf,
    pub zip_path: PathBuf,
    pub zip_bytes: Vec<u8>,
}

/// Writes run artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactEmitter {
    out_dir: PathBuf,
}

impl ArtifactEmitter {
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Emit all artifacts for `run`, naming files after `tag` (a recording
    /// index or an upload label).
    pub fn emit(&self, tag: &str, run: &RunOutput) -> Result<ArtifactBundle, ArtifactError> {
        std::fs::create_dir_all(&self.out_dir)?;

        if !run.aborted_batches.is_empty() {
            tracing::warn!(
                aborted = run.aborted_batches.len(),
                "reconstruction contains zeroed spans from aborted batches"
            );
        }

        let high_res_wav = self.out_dir.join(format!("track-{tag}-high-res.wav"));
        let low_res_wav = self.out_dir.join(format!("track-{tag}-low-res.wav"));
        let super_res_wav = self.out_dir.join(format!("track-{tag}-super-res.wav"));
        let spectrogram_png = self.out_dir.join(format!("spectrograms-{tag}.png"));
        let zip_path = self.out_dir.join(format!("track-{tag}.zip"));

        write_wav(&high_res_wav, &run.high_res)?;
        write_wav(&low_res_wav, &run.low_res)?;
        write_wav(&super_res_wav, &run.super_res)?;

        let img = render_panels(&[&run.low_res, &run.high_res, &run.super_res]);
        img.save(&spectrogram_png)?;

        let entries = [
            &high_res_wav,
            &low_res_wav,
            &super_res_wav,
            &spectrogram_png,
        ];
        let zip_bytes = zip_files(&entries)?;
        std::fs::write(&zip_path, &zip_bytes)?;

        tracing::info!(dir = %self.out_dir.display(), tag, "artifacts written");

        Ok(ArtifactBundle {
            high_res_wav,
            low_res_wav,
            super_res_wav,
            spectrogram_png,
            zip_path,
            zip_bytes,
        })
    }
}

/// Write a waveform as 16-bit PCM mono WAV.
pub fn write_wav(path: &Path, waveform: &Waveform) -> Result<(), ArtifactError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate_hz,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in &waveform.samples {
        writer.write_sample(sample_to_i16(s))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Bundle files into an uncompressed zip archive, returned as bytes.
fn zip_files(paths: &[&PathBuf]) -> Result<Vec<u8>, ArtifactError> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut archive = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for path in paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("artifact");
            archive.start_file(name, options)?;
            archive.write_all(&std::fs::read(path)?)?;
        }
        archive.finish()?;
    }
    Ok(cursor.into_inner())
}

/// Render vertically stacked mel spectrogram panels, one per waveform, into
/// a single image. Panels share the dB color mapping (0 dB at each panel's
/// own peak, floor at -`TOP_DB`), low frequencies at the bottom.
fn render_panels(waveforms: &[&Waveform]) -> image::RgbImage {
    let n = waveforms.len() as u32;
    let height = n * PANEL_HEIGHT + n.saturating_sub(1) * PANEL_GAP;
    let mut img = image::RgbImage::from_pixel(PANEL_WIDTH, height, image::Rgb([255, 255, 255]));

    for (i, waveform) in waveforms.iter().enumerate() {
        let mut analyzer = MelAnalyzer::new(waveform.sample_rate_hz.max(1));
        let mut spec = analyzer.compute(&waveform.samples);
        power_to_db(&mut spec.data, TOP_DB);

        let y0 = i as u32 * (PANEL_HEIGHT + PANEL_GAP);
        draw_panel(&mut img, y0, &spec);
    }

    img
}

fn draw_panel(img: &mut image::RgbImage, y0: u32, spec: &Spectrogram) {
    for y in 0..PANEL_HEIGHT {
        // Low mel bins at the panel's bottom edge.
        let bin = ((PANEL_HEIGHT - 1 - y) as usize * spec.n_mels) / PANEL_HEIGHT as usize;
        for x in 0..PANEL_WIDTH {
            let value = if spec.frames == 0 {
                -TOP_DB
            } else {
                let frame = (x as usize * spec.frames) / PANEL_WIDTH as usize;
                spec.value(frame, bin)
            };
            let t = (value + TOP_DB) / TOP_DB;
            img.put_pixel(x, y0 + y, image::Rgb(colormap(t)));
        }
    }
}

/// Piecewise-linear viridis ramp over `t` in [0, 1].
fn colormap(t: f32) -> [u8; 3] {
    const STOPS: [[f32; 3]; 9] = [
        [68.0, 1.0, 84.0],
        [71.0, 44.0, 122.0],
        [59.0, 81.0, 139.0],
        [44.0, 113.0, 142.0],
        [33.0, 144.0, 141.0],
        [39.0, 173.0, 129.0],
        [92.0, 200.0, 99.0],
        [170.0, 220.0, 50.0],
        [253.0, 231.0, 37.0],
    ];

    let t = t.clamp(0.0, 1.0) * (STOPS.len() - 1) as f32;
    let i = (t.floor() as usize).min(STOPS.len() - 2);
    let frac = t - i as f32;

    let mut rgb = [0u8; 3];
    for (c, out) in rgb.iter_mut().enumerate() {
        let v = STOPS[i][c] + (STOPS[i + 1][c] - STOPS[i][c]) * frac;
        *out = v.round() as u8;
    }
    rgb
}
