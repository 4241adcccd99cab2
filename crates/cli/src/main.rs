use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use mome_vision_core::bitmap::rgba_bitmap::RgbaBitmap;
use mome_vision_core::bridge::dispatch_logger::LogDispatchLogger;
use mome_vision_core::bridge::vision_bridge::VisionBridge;
use mome_vision_core::camera::domain::camera_device::CameraFacing;
use mome_vision_core::camera::infrastructure::image_sequence;
use mome_vision_core::camera::infrastructure::replay_camera::ReplayCamera;
use mome_vision_core::detection::infrastructure::directory_asset_source::DirectoryAssetSource;
use mome_vision_core::detection::infrastructure::onnx_detector_factory::OnnxDetectorFactory;
use mome_vision_core::shared::constants::IMAGE_EXTENSIONS;
use mome_vision_core::shared::detection::{Accelerator, DetectorKind};
use mome_vision_core::shared::settings::BridgeSettings;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Face and segmentation detection through the mome vision bridge.
#[derive(Parser)]
#[command(name = "mome-vision")]
struct Cli {
    /// JSON settings file. Missing fields take their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the model files.
    #[arg(long, global = true, default_value = "models")]
    models: PathBuf,

    /// Compute backend for inference.
    #[arg(long, global = true, value_enum, default_value = "cpu")]
    accelerator: AcceleratorArg,

    /// Override the detection confidence threshold (0.0-1.0).
    #[arg(long, global = true)]
    confidence: Option<f32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect and annotate a single image.
    Detect {
        /// Input image file.
        input: PathBuf,
        /// Annotated output image.
        output: PathBuf,
        #[arg(long, value_enum, default_value = "face")]
        kind: KindArg,
    },
    /// Replay a directory of frames through the camera pipeline.
    Camera {
        /// Directory of input frames, replayed in file-name order.
        frames: PathBuf,
        /// Directory that receives the annotated frames.
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum)]
        facing: Option<FacingArg>,
        /// Replay rate; 0 replays as fast as possible.
        #[arg(long, default_value = "0")]
        fps: f64,
    },
    /// Print the effective settings as JSON.
    Settings,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Face,
    Segmentation,
}

impl From<KindArg> for DetectorKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Face => DetectorKind::Face,
            KindArg::Segmentation => DetectorKind::Segmentation,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AcceleratorArg {
    Cpu,
    Gpu,
}

impl From<AcceleratorArg> for Accelerator {
    fn from(accelerator: AcceleratorArg) -> Self {
        match accelerator {
            AcceleratorArg::Cpu => Accelerator::Cpu,
            AcceleratorArg::Gpu => Accelerator::Gpu,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FacingArg {
    Front,
    Back,
}

impl From<FacingArg> for CameraFacing {
    fn from(facing: FacingArg) -> Self {
        match facing {
            FacingArg::Front => CameraFacing::Front,
            FacingArg::Back => CameraFacing::Back,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    validate(&cli)?;
    let mut settings = load_settings(&cli)?;
    let accelerator = Accelerator::from(cli.accelerator);

    match cli.command {
        Command::Detect {
            input,
            output,
            kind,
        } => run_detect(settings, &cli.models, accelerator, kind.into(), &input, &output),
        Command::Camera {
            frames,
            output,
            facing,
            fps,
        } => {
            if let Some(facing) = facing {
                settings.camera_facing = facing.into();
            }
            run_camera(settings, &cli.models, accelerator, &frames, &output, fps)
        }
        Command::Settings => {
            println!("{}", settings.to_json());
            Ok(())
        }
    }
}

fn load_settings(cli: &Cli) -> CliResult<BridgeSettings> {
    let mut settings = match &cli.config {
        Some(path) => BridgeSettings::load(path)?,
        None => BridgeSettings::default(),
    };
    if let Some(confidence) = cli.confidence {
        settings.face.confidence = confidence;
        settings.segmentation.confidence = confidence;
    }
    Ok(settings)
}

fn run_detect(
    settings: BridgeSettings,
    models: &Path,
    accelerator: Accelerator,
    kind: DetectorKind,
    input: &Path,
    output: &Path,
) -> CliResult<()> {
    let bridge: VisionBridge<ReplayCamera> =
        VisionBridge::new(settings, Box::new(OnnxDetectorFactory::new()));
    let assets = DirectoryAssetSource::new(models);
    if !bridge.load_detector(kind, &assets, accelerator) {
        return Err(format!("Could not load the {kind} detector from {}", models.display()).into());
    }

    let image = image::open(input)?.to_rgba8();
    let mut bitmap = RgbaBitmap::from_image(image);
    if !bridge.detect_on_image(kind, &mut bitmap) {
        return Err(format!("{kind} detection failed on {}", input.display()).into());
    }

    let annotated = bitmap
        .into_image()
        .ok_or("annotated bitmap has inconsistent geometry")?;
    annotated.save(output)?;
    log::info!("Output written to {}", output.display());
    bridge.teardown();
    Ok(())
}

fn run_camera(
    settings: BridgeSettings,
    models: &Path,
    accelerator: Accelerator,
    frames_dir: &Path,
    output: &Path,
    fps: f64,
) -> CliResult<()> {
    std::fs::create_dir_all(output)?;
    let frames = image_sequence::load_frames(frames_dir)?;
    log::info!("Loaded {} frames from {}", frames.len(), frames_dir.display());

    let order = settings.dispatch_order.clone();
    let bridge: VisionBridge<ReplayCamera> =
        VisionBridge::new(settings, Box::new(OnnxDetectorFactory::new()));
    bridge.set_dispatch_logger(Box::new(LogDispatchLogger::default()));

    let assets = DirectoryAssetSource::new(models);
    let loaded = order
        .iter()
        .filter(|&&kind| bridge.load_detector(kind, &assets, accelerator))
        .count();
    if loaded == 0 {
        return Err(format!("No detectors could be loaded from {}", models.display()).into());
    }

    bridge.attach_camera(ReplayCamera::new(frames, bridge.frame_sink()).with_fps(fps));
    if !bridge.set_output_window(Some(output)) {
        return Err(format!("Cannot present frames to {}", output.display()).into());
    }
    if !bridge.open_camera() {
        return Err("Camera failed to open".into());
    }
    bridge.with_camera(ReplayCamera::wait_until_finished);

    let presented = bridge.with_camera(|camera| camera.frames_presented()).unwrap_or(0);
    if bridge.is_warn() {
        log::warn!("Last frame ended in the proximity warning zone");
    }
    bridge.teardown();
    log::info!("Wrote {presented} annotated frames to {}", output.display());
    Ok(())
}

fn validate(cli: &Cli) -> CliResult<()> {
    if let Some(confidence) = cli.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(
                format!("Confidence must be between 0.0 and 1.0, got {confidence}").into(),
            );
        }
    }
    match &cli.command {
        Command::Detect { input, .. } => {
            if !input.is_file() {
                return Err(format!("Input file not found: {}", input.display()).into());
            }
            if !is_image(input) {
                return Err(format!("Unsupported image type: {}", input.display()).into());
            }
        }
        Command::Camera { frames, fps, .. } => {
            if !frames.is_dir() {
                return Err(format!("Frames directory not found: {}", frames.display()).into());
            }
            if *fps < 0.0 {
                return Err(format!("Frame rate must not be negative, got {fps}").into());
            }
        }
        Command::Settings => {}
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
