use std::path::{Path, PathBuf};

use bpcam_signals::pipeline::artifact_stem;
use bpcam_signals::vision::{FrameSource, ImageSequenceSource, SeetaFaceDetector};
use bpcam_signals::{BpConfig, BpPipeline, BpReading, RawSignal, RunReport};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG: &str = "bpcam.toml";

#[derive(Parser)]
#[command(name = "bpcam", version, about = "Blood-pressure estimation from webcam video")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate from a directory of frames or a video file
    Analyze {
        /// Directory of still frames, ordered by file name
        #[arg(long, conflicts_with = "video", required_unless_present = "video")]
        frames: Option<PathBuf>,
        /// Frame rate of the still frames (defaults to capture.fps)
        #[arg(long, requires = "frames")]
        fps: Option<f64>,
        /// Video file (needs the `opencv` feature)
        #[arg(long)]
        video: Option<PathBuf>,
    },
    /// Record from a camera, then estimate; press Enter to stop early
    Record {
        /// Recording length in seconds (defaults to capture.duration_sec)
        #[arg(long)]
        duration: Option<f64>,
        /// Camera device index (defaults to capture.camera_index)
        #[arg(long)]
        camera: Option<i32>,
    },
    /// Estimate from a previously written signal CSV
    Features {
        #[arg(long)]
        signal: PathBuf,
    },
    /// Categorize a systolic / diastolic pair
    Classify {
        #[arg(long)]
        systolic: f64,
        #[arg(long)]
        diastolic: f64,
    },
}

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(d) = "bpcam_signals=info".parse() {
        filter = filter.add_directive(d);
    }
    if let Ok(d) = "bpcam=info".parse() {
        filter = filter.add_directive(d);
    }

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_config(path: Option<&Path>) -> Result<BpConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => BpConfig::from_file_with_env(path)?,
        None => BpConfig::load_layered(Some(Path::new(DEFAULT_CONFIG)), None)?,
    };
    Ok(config)
}

fn load_detector(config: &BpConfig) -> Result<SeetaFaceDetector, Box<dyn std::error::Error>> {
    let path = config
        .roi
        .detector_model
        .as_deref()
        .ok_or("roi.detector_model is not configured")?;
    Ok(SeetaFaceDetector::load(path, &config.roi.detector)?)
}

fn analyze<S: FrameSource + ?Sized>(
    pipeline: &BpPipeline,
    source: &mut S,
) -> Result<RunReport, Box<dyn std::error::Error>> {
    let detector = load_detector(pipeline.config())?;
    if pipeline.config().signal.parallel_localization {
        warn!("SeetaFace detector cannot be cloned per worker, localizing sequentially");
    }
    let outcome = pipeline.run(source, detector)?;
    for path in &outcome.artifacts {
        info!(path = %path.display(), "artifact written");
    }
    Ok(outcome.report())
}

#[cfg(feature = "opencv")]
fn analyze_video(pipeline: &BpPipeline, path: &Path) -> Result<RunReport, Box<dyn std::error::Error>> {
    let mut source = bpcam_signals::vision::VideoCaptureSource::open_file(path)?;
    analyze(pipeline, &mut source)
}

#[cfg(not(feature = "opencv"))]
fn analyze_video(_pipeline: &BpPipeline, path: &Path) -> Result<RunReport, Box<dyn std::error::Error>> {
    Err(format!("cannot read {}: bpcam was built without the `opencv` feature", path.display()).into())
}

#[cfg(feature = "opencv")]
fn record(pipeline: &BpPipeline, duration: f64, camera: i32) -> Result<RunReport, Box<dyn std::error::Error>> {
    use bpcam_signals::vision::{RecordingSource, StopSignal, VideoCaptureSource};

    let stop = StopSignal::new();
    let camera = VideoCaptureSource::open_camera(camera)?;
    let mut source = RecordingSource::new(camera, Some(duration), stop.clone());

    eprintln!("Recording for up to {:.0} s, press Enter to stop early", duration);
    std::thread::spawn(move || {
        stop.stop_on_line(std::io::stdin().lock());
    });

    analyze(pipeline, &mut source)
}

#[cfg(not(feature = "opencv"))]
fn record(_pipeline: &BpPipeline, _duration: f64, _camera: i32) -> Result<RunReport, Box<dyn std::error::Error>> {
    Err("live recording needs the `opencv` feature".into())
}

fn print_report(report: &RunReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Systolic:  {:.1} mmHg", report.systolic);
    println!("Diastolic: {:.1} mmHg", report.diastolic);
    println!("Category:  {}", report.category);
    println!("Source:    {} ({})", report.source.kind, report.source.detail);
    if let (Some(frames), Some(localized)) = (report.frames, report.localized) {
        println!("Frames:    {} localized of {}", localized, frames);
    }
    println!("Samples:   {} at {:.2} Hz", report.samples, report.fs);
    println!(
        "Features:  peaks={} dominant={:.3} Hz mean_interval={:.3} s",
        report.features.num_peaks, report.features.dominant_frequency, report.features.mean_peak_interval
    );
    println!("Suggestions:");
    for s in &report.suggestions {
        println!("  - {}", s);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Classify { systolic, diastolic } => {
            let reading = BpReading::new(systolic, diastolic);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reading)?);
            } else {
                println!("{}", reading);
                for s in reading.category.suggestions() {
                    println!("  - {}", s);
                }
            }
        }
        Commands::Features { signal } => {
            let config = load_config(cli.config.as_deref())?;
            let pipeline = BpPipeline::new(config);

            let raw = RawSignal::read_csv(&signal)?;
            let estimate = pipeline.estimate(&raw)?;
            let mut report = estimate.report();
            report.artifacts = pipeline.write_features(&artifact_stem(&signal.to_string_lossy()), &estimate.features)?;
            print_report(&report, cli.json)?;
        }
        Commands::Analyze { frames, fps, video } => {
            let config = load_config(cli.config.as_deref())?;
            let fps = fps.unwrap_or(config.capture.fps);
            let pipeline = BpPipeline::new(config);

            let report = match (frames, video) {
                (Some(dir), _) => {
                    let mut source = ImageSequenceSource::open(&dir, fps)?;
                    analyze(&pipeline, &mut source)?
                }
                (None, Some(video)) => analyze_video(&pipeline, &video)?,
                (None, None) => return Err("either --frames or --video is required".into()),
            };
            print_report(&report, cli.json)?;
        }
        Commands::Record { duration, camera } => {
            let config = load_config(cli.config.as_deref())?;
            let duration = duration.unwrap_or(config.capture.duration_sec);
            let camera = camera.unwrap_or(config.capture.camera_index);
            let pipeline = BpPipeline::new(config);

            let report = record(&pipeline, duration, camera)?;
            print_report(&report, cli.json)?;
        }
    }
    Ok(())
}
