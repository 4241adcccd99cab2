use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::RgbImage;

use mome_vision_core::bitmap::host_bitmap::BitmapFormat;
use mome_vision_core::bitmap::rgba_bitmap::RgbaBitmap;
use mome_vision_core::bridge::vision_bridge::VisionBridge;
use mome_vision_core::camera::domain::camera_device::{CameraDevice, CameraFacing};
use mome_vision_core::camera::infrastructure::replay_camera::ReplayCamera;
use mome_vision_core::detection::domain::asset_source::AssetSource;
use mome_vision_core::detection::domain::detector::{
    DetectorConfig, DetectorEngine, DetectorFactory, RegionDetector, SegmentingDetector,
};
use mome_vision_core::detection::infrastructure::memory_asset_source::MemoryAssetSource;
use mome_vision_core::error::{CameraError, DetectError, LoadError};
use mome_vision_core::shared::detection::{
    Accelerator, Detection, DetectionResult, DetectorKind, Rect,
};
use mome_vision_core::shared::frame::FrameBuffer;
use mome_vision_core::shared::pixel_format::PixelLayout;
use mome_vision_core::shared::settings::BridgeSettings;

// --- Stub detectors ---

/// Counts threads inside detector code at once. The registry lock must keep
/// this at one or zero.
#[derive(Default)]
struct Occupancy {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Occupancy {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Boxes the bounding rectangle of all non-black pixels.
struct BrightRegionDetector {
    occupancy: Arc<Occupancy>,
    delay: Duration,
}

impl RegionDetector for BrightRegionDetector {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<Detection>, DetectError> {
        self.occupancy.enter();
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let (w, channels) = (frame.width() as usize, frame.channels());
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (i, px) in frame.data().chunks_exact(channels).enumerate() {
            if px[..3].iter().any(|&v| v > 0) {
                let (x, y) = (i % w, i / w);
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        self.occupancy.leave();
        Ok(bounds
            .map(|(x0, y0, x1, y1)| Detection {
                rect: Rect::from_corners(x0 as f32, y0 as f32, (x1 + 1) as f32, (y1 + 1) as f32),
                label: 0,
                score: 0.9,
            })
            .into_iter()
            .collect())
    }
}

struct EmptySegmentation {
    occupancy: Arc<Occupancy>,
}

impl SegmentingDetector for EmptySegmentation {
    fn detect(&mut self, _frame: &FrameBuffer) -> Result<DetectionResult, DetectError> {
        self.occupancy.enter();
        self.occupancy.leave();
        Ok(DetectionResult::default())
    }
}

/// Accepts any asset except one that reads `corrupt`.
struct StubFactory {
    occupancy: Arc<Occupancy>,
    detect_delay: Duration,
    build_delay: Duration,
    builds: Arc<AtomicUsize>,
}

impl StubFactory {
    fn new(occupancy: Arc<Occupancy>) -> Self {
        Self {
            occupancy,
            detect_delay: Duration::ZERO,
            build_delay: Duration::ZERO,
            builds: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DetectorFactory for StubFactory {
    fn build(
        &self,
        kind: DetectorKind,
        source: &dyn AssetSource,
        config: &DetectorConfig,
    ) -> Result<DetectorEngine, LoadError> {
        self.occupancy.enter();
        if !self.build_delay.is_zero() {
            thread::sleep(self.build_delay);
        }
        let bytes = source.read(&config.model);
        self.occupancy.leave();
        if bytes? == b"corrupt" {
            return Err(LoadError::model(config.model.clone(), "truncated graph"));
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(match kind {
            DetectorKind::Face => DetectorEngine::Region(Box::new(BrightRegionDetector {
                occupancy: Arc::clone(&self.occupancy),
                delay: self.detect_delay,
            })),
            DetectorKind::Segmentation => DetectorEngine::Segmenting(Box::new(EmptySegmentation {
                occupancy: Arc::clone(&self.occupancy),
            })),
        })
    }
}

fn valid_assets() -> MemoryAssetSource {
    let settings = BridgeSettings::default();
    MemoryAssetSource::new()
        .with_asset(&settings.face.model, b"weights".to_vec())
        .with_asset(&settings.segmentation.model, b"weights".to_vec())
}

fn corrupt_assets() -> MemoryAssetSource {
    let settings = BridgeSettings::default();
    MemoryAssetSource::new().with_asset(&settings.face.model, b"corrupt".to_vec())
}

/// Camera that records whether the bridge ever reached it.
#[derive(Default)]
struct SpyCamera {
    calls: Arc<AtomicUsize>,
}

impl CameraDevice for SpyCamera {
    type Surface = u64;
    type Window = u64;

    fn open(&mut self, _facing: CameraFacing) -> Result<(), CameraError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {}

    fn resolve_window(&self, surface: &u64) -> Option<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (*surface != 0).then_some(*surface)
    }

    fn set_window(&mut self, _window: u64) -> Result<(), CameraError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn spy_bridge() -> VisionBridge<SpyCamera> {
    VisionBridge::new(
        BridgeSettings::default(),
        Box::new(StubFactory::new(Arc::new(Occupancy::default()))),
    )
}

// --- Scenarios ---

#[test]
fn test_load_detect_corrupt_reload_scenario() {
    let bridge = spy_bridge();

    assert!(bridge.load_detector(DetectorKind::Face, &valid_assets(), Accelerator::Cpu));
    let first = bridge.registry().instance_id(DetectorKind::Face);
    assert!(first.is_some());

    // A blank image yields no regions, so nothing is drawn
    let mut blank = RgbaBitmap::new(32, 24);
    let before = blank.pixels().to_vec();
    assert!(bridge.detect_on_image(DetectorKind::Face, &mut blank));
    assert_eq!(blank.pixels(), before.as_slice());

    assert!(!bridge.load_detector(DetectorKind::Face, &corrupt_assets(), Accelerator::Cpu));
    assert_eq!(bridge.registry().instance_id(DetectorKind::Face), first);
}

#[test]
fn test_detect_on_image_draws_overlay_for_bright_region() {
    let bridge = spy_bridge();
    bridge.load_detector(DetectorKind::Face, &valid_assets(), Accelerator::Cpu);

    let mut image = image::RgbaImage::from_pixel(64, 48, image::Rgba([0, 0, 0, 255]));
    for y in 20..30 {
        for x in 20..30 {
            image.put_pixel(x, y, image::Rgba([200, 200, 200, 128]));
        }
    }
    let mut bitmap = RgbaBitmap::from_image(image.clone());
    assert!(bridge.detect_on_image(DetectorKind::Face, &mut bitmap));

    assert_ne!(bitmap.pixels(), image.as_raw().as_slice());
    // Alpha survives the round trip through the RGB working buffer
    let alphas: Vec<u8> = bitmap.pixels().chunks_exact(4).map(|p| p[3]).collect();
    let expected: Vec<u8> = image.as_raw().chunks_exact(4).map(|p| p[3]).collect();
    assert_eq!(alphas, expected);
    assert_eq!(bitmap.lock_count(), bitmap.unlock_count());
}

#[test]
fn test_unsupported_bitmap_format_is_untouched() {
    let bridge = spy_bridge();
    bridge.load_detector(DetectorKind::Face, &valid_assets(), Accelerator::Cpu);

    let mut bitmap = RgbaBitmap::from_rgba(2, 2, vec![9; 16]).with_format(BitmapFormat::A8);
    assert!(!bridge.detect_on_image(DetectorKind::Face, &mut bitmap));
    assert_eq!(bitmap.pixels(), &[9; 16]);
}

#[test]
fn test_null_surface_never_reaches_camera() {
    let bridge = spy_bridge();
    let spy = SpyCamera::default();
    let calls = Arc::clone(&spy.calls);
    bridge.attach_camera(spy);

    assert!(!bridge.set_output_window(None));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert!(!bridge.set_output_window(Some(&0)));
    assert!(bridge.set_output_window(Some(&42)));
}

#[test]
fn test_camera_ops_without_collaborator_report_failure() {
    let bridge = spy_bridge();
    assert!(!bridge.open_camera());
    assert!(!bridge.set_output_window(Some(&1)));
    assert!(bridge.close_camera());
}

#[test]
fn test_invalid_frames_touch_nothing() {
    let occupancy = Arc::new(Occupancy::default());
    let factory = StubFactory::new(Arc::clone(&occupancy));
    let bridge: VisionBridge<SpyCamera> =
        VisionBridge::new(BridgeSettings::default(), Box::new(factory));
    bridge.load_detector(DetectorKind::Face, &valid_assets(), Accelerator::Cpu);
    let sink = bridge.frame_sink();

    for (w, h) in [(0, 4), (4, 0), (-3, 4), (4, -1), (8, 8)] {
        let mut data = vec![200u8; 4 * 4 * 3];
        let mut frame = FrameBuffer::new(&mut data, w, h, PixelLayout::Rgb);
        sink.on_frame(&mut frame);
        assert!(data.iter().all(|&b| b == 200), "frame {w}x{h} was modified");
    }
    assert_eq!(bridge.dispatcher().frames_dispatched(), 0);
    assert_eq!(occupancy.peak.load(Ordering::SeqCst), 1);
}

#[test]
fn test_replay_session_presents_annotated_frames() {
    let out = tempfile::tempdir().unwrap();
    let bridge: VisionBridge<ReplayCamera> = VisionBridge::new(
        BridgeSettings::default(),
        Box::new(StubFactory::new(Arc::new(Occupancy::default()))),
    );
    bridge.load_detector(DetectorKind::Face, &valid_assets(), Accelerator::Cpu);

    let mut frame = RgbImage::new(48, 48);
    for y in 40..46 {
        for x in 10..20 {
            frame.put_pixel(x, y, image::Rgb([180, 180, 180]));
        }
    }
    bridge.attach_camera(ReplayCamera::new(vec![frame.clone(); 3], bridge.frame_sink()));

    assert!(bridge.set_output_window(Some(out.path())));
    assert!(bridge.open_camera());
    bridge.with_camera(ReplayCamera::wait_until_finished);

    assert_eq!(bridge.dispatcher().frames_dispatched(), 3);
    assert_eq!(bridge.with_camera(|c| c.frames_presented()), Some(3));
    let written = image::open(out.path().join("frame_00002.png"))
        .unwrap()
        .to_rgb8();
    assert_ne!(written.as_raw(), frame.as_raw());
    // The box sits low in the frame, so the last frame left a warning
    assert!(bridge.is_warn());

    assert!(bridge.close_camera());
    assert!(!bridge.is_warn());
    bridge.teardown();
    assert!(bridge.registry().loaded_kinds().is_empty());
}

// --- Stress ---

#[test]
fn test_reloads_interleaved_with_frames_stay_consistent() {
    let occupancy = Arc::new(Occupancy::default());
    let mut factory = StubFactory::new(Arc::clone(&occupancy));
    factory.detect_delay = Duration::from_micros(200);
    factory.build_delay = Duration::from_micros(300);
    let builds = Arc::clone(&factory.builds);

    let settings = BridgeSettings {
        dispatch_order: vec![DetectorKind::Face],
        ..BridgeSettings::default()
    };
    let bridge: Arc<VisionBridge<SpyCamera>> =
        Arc::new(VisionBridge::new(settings, Box::new(factory)));
    assert!(bridge.load_detector(DetectorKind::Face, &valid_assets(), Accelerator::Cpu));

    let stop = Arc::new(AtomicBool::new(false));
    let frames_done = Arc::new(AtomicUsize::new(0));

    let mut workers = Vec::new();
    for _ in 0..2 {
        let dispatcher = Arc::clone(bridge.dispatcher());
        let stop = Arc::clone(&stop);
        let frames_done = Arc::clone(&frames_done);
        workers.push(thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                let mut data = vec![0u8; 16 * 16 * 3];
                data[..3].copy_from_slice(&[255, 255, 255]);
                let mut frame = FrameBuffer::new(&mut data, 16, 16, PixelLayout::Rgb);
                let report = dispatcher.dispatch(&mut frame).unwrap();
                // Every frame sees a loaded face detector, even mid-reload
                assert!(report.skipped.is_empty(), "frame saw an empty slot: {report:?}");
                assert!(report.failed.is_empty(), "{report:?}");
                assert_eq!(report.ran, vec![DetectorKind::Face]);
                assert_eq!(report.detections, 1);
                frames_done.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }

    let mut last_id = bridge.registry().instance_id(DetectorKind::Face);
    for round in 0..40 {
        let assets = if round % 4 == 3 {
            corrupt_assets()
        } else {
            valid_assets()
        };
        let ok = bridge.load_detector(DetectorKind::Face, &assets, Accelerator::Cpu);
        let id = bridge.registry().instance_id(DetectorKind::Face);
        // The slot is never empty mid-run, and only a good load changes it
        assert!(id.is_some());
        if ok {
            assert_ne!(id, last_id);
        } else {
            assert_eq!(id, last_id);
        }
        last_id = id;
    }

    stop.store(true, Ordering::SeqCst);
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(builds.load(Ordering::SeqCst), 31);
    assert!(frames_done.load(Ordering::SeqCst) > 0);
    assert_eq!(
        bridge.dispatcher().frames_dispatched(),
        frames_done.load(Ordering::SeqCst) as u64
    );
    // Loads and frames never overlapped inside detector code
    assert_eq!(occupancy.peak.load(Ordering::SeqCst), 1);
}
