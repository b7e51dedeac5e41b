use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wavelift::artifact::ArtifactEmitter;
use wavelift::audio::{parse_wav_bytes, Waveform};
use wavelift::config::PipelineConfig;
use wavelift::dataset::RecordingStore;
use wavelift::net::ResidualNet;
use wavelift::pipeline::Pipeline;
use wavelift::predict::{Predictor, SplineBaseline};
use wavelift::upload::decode_upload_json;

#[derive(Debug, Parser)]
#[command(name = "wavelift")]
#[command(about = "Speech audio super-resolution demo harness", long_about = None)]
struct Args {
    /// Path to a WAV recording to reconstruct.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Directory of dataset recordings (WAV files, optional .txt transcripts).
    #[arg(long)]
    dataset_dir: Option<PathBuf>,

    /// Recording index within --dataset-dir.
    #[arg(long)]
    index: Option<usize>,

    /// File holding a JSON upload body ({"recordingAsBase64": "data:...;base64,..."}).
    #[arg(long)]
    upload_json: Option<PathBuf>,

    /// Safetensors checkpoint for the residual upsampler.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Use the cubic-spline interpolation baseline instead of a checkpoint.
    #[arg(long, default_value_t = false)]
    baseline: bool,

    /// Pipeline configuration JSON; defaults match the demo model.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for artifacts.
    #[arg(long, default_value = "outputs")]
    out_dir: PathBuf,

    /// Validate a checkpoint's tensors without running a reconstruction.
    #[arg(long, default_value_t = false)]
    inspect_model: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if args.inspect_model {
        let model = args
            .model
            .as_ref()
            .context("--inspect-model requires --model")?;
        return inspect_model(model, &config);
    }

    let modes = u32::from(args.audio.is_some())
        + u32::from(args.dataset_dir.is_some())
        + u32::from(args.upload_json.is_some());
    if modes != 1 {
        anyhow::bail!("choose exactly one input: --audio, --dataset-dir, or --upload-json");
    }
    if args.baseline == args.model.is_some() {
        anyhow::bail!("choose exactly one predictor: --model <checkpoint> or --baseline");
    }

    // The predictor is loaded once; every run borrows it read-only.
    let predictor: Box<dyn Predictor> = if let Some(path) = &args.model {
        Box::new(
            ResidualNet::from_path(path, config.chunk_len)
                .with_context(|| format!("load checkpoint {}", path.display()))?,
        )
    } else {
        Box::new(SplineBaseline::new(
            config.chunk_len,
            config.resampling_factor,
        ))
    };

    let pipeline = Pipeline::new(config, predictor.as_ref()).context("configure pipeline")?;
    let (tag, waveform) = load_input(&args, pipeline.config())?;

    let run = pipeline.run(&waveform)?;

    let emitter = ArtifactEmitter::new(&args.out_dir);
    let bundle = emitter.emit(&tag, &run).context("emit artifacts")?;
    println!("{}", bundle.zip_path.display());
    Ok(())
}

fn load_input(args: &Args, config: &PipelineConfig) -> Result<(String, Waveform)> {
    if let Some(path) = &args.audio {
        let bytes = std::fs::read(path).with_context(|| format!("read file {path:?}"))?;
        let waveform = parse_wav_bytes(&bytes).context("parse wav")?;
        return Ok(("custom-recording".to_string(), waveform));
    }

    if let Some(dir) = &args.dataset_dir {
        let index = args.index.context("--dataset-dir requires --index")?;
        let store =
            RecordingStore::open(dir).with_context(|| format!("open dataset dir {dir:?}"))?;
        let recording = store.get(index)?;
        if let Some(transcript) = &recording.transcript {
            tracing::info!(transcript = %transcript, "recording transcript");
        }
        if recording.waveform.sample_rate_hz != config.sample_rate_hz {
            tracing::warn!(
                got = recording.waveform.sample_rate_hz,
                expected = config.sample_rate_hz,
                "recording sample rate differs from the configured dataset rate"
            );
        }
        return Ok((format!("no-{index}"), recording.waveform));
    }

    let path = args.upload_json.as_ref().expect("one input mode is set");
    let body =
        std::fs::read_to_string(path).with_context(|| format!("read upload body {path:?}"))?;
    let waveform = decode_upload_json(&body)?;
    Ok(("custom-recording".to_string(), waveform))
}

fn inspect_model(path: &Path, config: &PipelineConfig) -> Result<()> {
    let net = ResidualNet::from_path(path, config.chunk_len)
        .with_context(|| format!("load checkpoint {}", path.display()))?;
    eprintln!(
        "checkpoint ok: channels={} blocks={} factor={} output_len={}",
        net.channels(),
        net.block_count(),
        net.factor(),
        net.output_len()
    );
    config
        .validate_output_len(net.output_len())
        .context("checkpoint does not match the configured chunk geometry")?;
    Ok(())
}
