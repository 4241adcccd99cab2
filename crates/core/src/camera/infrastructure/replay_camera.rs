use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use image::RgbImage;

use crate::camera::domain::camera_device::{CameraDevice, CameraFacing};
use crate::camera::domain::frame_sink::FrameSink;
use crate::error::CameraError;
use crate::shared::frame::FrameBuffer;
use crate::shared::pixel_format::PixelLayout;

const PRESENT_QUEUE_CAPACITY: usize = 4;

/// Output view of the replay camera: a directory that receives one PNG per
/// presented frame.
#[derive(Clone, Debug)]
pub struct DirectoryWindow {
    dir: PathBuf,
}

impl DirectoryWindow {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn present(&self, index: usize, frame: &RgbImage) -> Result<PathBuf, CameraError> {
        let path = self.dir.join(format!("frame_{index:05}.png"));
        frame
            .save(&path)
            .map_err(|e| CameraError::Window(format!("{}: {e}", path.display())))?;
        Ok(path)
    }
}

/// Counters shared between the camera and its worker threads.
#[derive(Default)]
struct ReplayStats {
    delivered: AtomicUsize,
    presented: AtomicUsize,
}

struct CaptureSession {
    stop: Arc<AtomicBool>,
    capture: JoinHandle<()>,
    presenter: JoinHandle<()>,
}

/// Camera stand-in that replays preloaded images as if captured live.
///
/// Each open spawns a capture thread, which hands every frame to the sink
/// synchronously, and a presenter thread that writes annotated frames to the
/// current window. The front camera is mirrored, like a selfie preview.
pub struct ReplayCamera {
    frames: Arc<Vec<RgbImage>>,
    frame_interval: Duration,
    looping: bool,
    sink: Arc<dyn FrameSink>,
    window: Arc<Mutex<Option<DirectoryWindow>>>,
    stats: Arc<ReplayStats>,
    session: Option<CaptureSession>,
}

impl ReplayCamera {
    pub fn new(frames: Vec<RgbImage>, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            frames: Arc::new(frames),
            frame_interval: Duration::ZERO,
            looping: false,
            sink,
            window: Arc::new(Mutex::new(None)),
            stats: Arc::new(ReplayStats::default()),
            session: None,
        }
    }

    /// Paces delivery at `fps` frames per second. Zero, negative, non-finite
    /// and rates too small to express as an interval replay as fast as possible.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.frame_interval = if fps > 0.0 {
            Duration::try_from_secs_f64(1.0 / fps).unwrap_or_else(|e| {
                log::warn!("Unusable replay rate {fps} fps ({e}), replaying unpaced");
                Duration::ZERO
            })
        } else {
            Duration::ZERO
        };
        self
    }

    /// Restart from the first frame after the last one until closed.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Frames handed to the sink since construction.
    pub fn frames_delivered(&self) -> usize {
        self.stats.delivered.load(Ordering::Relaxed)
    }

    /// Frames written to a window since construction.
    pub fn frames_presented(&self) -> usize {
        self.stats.presented.load(Ordering::Relaxed)
    }

    /// Blocks until a non-looping replay has delivered and presented every frame.
    pub fn wait_until_finished(&mut self) {
        if let Some(session) = self.session.take() {
            join_session(session);
        }
    }

    fn spawn_session(&self, facing: CameraFacing) -> CaptureSession {
        let stop = Arc::new(AtomicBool::new(false));
        let (present_tx, present_rx) =
            crossbeam_channel::bounded::<(usize, RgbImage)>(PRESENT_QUEUE_CAPACITY);

        let capture = {
            let frames = Arc::clone(&self.frames);
            let sink = Arc::clone(&self.sink);
            let stop = Arc::clone(&stop);
            let stats = Arc::clone(&self.stats);
            let interval = self.frame_interval;
            let looping = self.looping;
            std::thread::spawn(move || {
                let mut index = 0usize;
                loop {
                    for source in frames.iter() {
                        if stop.load(Ordering::Relaxed) {
                            return;
                        }
                        let mut image = source.clone();
                        if facing == CameraFacing::Front {
                            image::imageops::flip_horizontal_in_place(&mut image);
                        }
                        let (w, h) = image.dimensions();
                        {
                            let mut frame =
                                FrameBuffer::new(&mut image, w as i32, h as i32, PixelLayout::Rgb);
                            sink.on_frame(&mut frame);
                        }
                        stats.delivered.fetch_add(1, Ordering::Relaxed);
                        if present_tx.send((index, image)).is_err() {
                            return;
                        }
                        index += 1;
                        if !interval.is_zero() {
                            std::thread::sleep(interval);
                        }
                    }
                    if !looping {
                        return;
                    }
                }
            })
        };

        let presenter = {
            let window = Arc::clone(&self.window);
            let stats = Arc::clone(&self.stats);
            std::thread::spawn(move || {
                for (index, image) in present_rx {
                    let target = window
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone();
                    let Some(target) = target else {
                        continue;
                    };
                    match target.present(index, &image) {
                        Ok(_) => {
                            stats.presented.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => log::warn!("Dropped frame {index}: {e}"),
                    }
                }
            })
        };

        CaptureSession {
            stop,
            capture,
            presenter,
        }
    }
}

fn join_session(session: CaptureSession) {
    if session.capture.join().is_err() {
        log::error!("Replay capture thread panicked");
    }
    // The capture thread owned the only sender, so the presenter drains and exits.
    if session.presenter.join().is_err() {
        log::error!("Replay presenter thread panicked");
    }
}

impl CameraDevice for ReplayCamera {
    type Surface = Path;
    type Window = DirectoryWindow;

    fn open(&mut self, facing: CameraFacing) -> Result<(), CameraError> {
        if self.frames.is_empty() {
            return Err(CameraError::Open("no frames to replay".into()));
        }
        self.close();
        log::info!(
            "Opening replay camera ({} frames, {:?} facing)",
            self.frames.len(),
            facing
        );
        self.session = Some(self.spawn_session(facing));
        Ok(())
    }

    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop.store(true, Ordering::Relaxed);
            join_session(session);
            log::info!("Replay camera closed");
        }
    }

    fn resolve_window(&self, surface: &Path) -> Option<DirectoryWindow> {
        surface.is_dir().then(|| DirectoryWindow {
            dir: surface.to_path_buf(),
        })
    }

    fn set_window(&mut self, window: DirectoryWindow) -> Result<(), CameraError> {
        log::debug!("Replay camera presenting to {}", window.dir.display());
        *self.window.lock().unwrap_or_else(PoisonError::into_inner) = Some(window);
        Ok(())
    }
}

impl Drop for ReplayCamera {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Paints the first pixel white and counts calls.
    #[derive(Default)]
    struct MarkingSink {
        calls: AtomicUsize,
    }

    impl FrameSink for MarkingSink {
        fn on_frame(&self, frame: &mut FrameBuffer) {
            self.calls.fetch_add(1, Ordering::Relaxed);
            frame.data_mut()[..3].copy_from_slice(&[255, 255, 255]);
        }
    }

    fn frames(n: usize) -> Vec<RgbImage> {
        (0..n)
            .map(|i| RgbImage::from_pixel(4, 3, image::Rgb([i as u8, 0, 0])))
            .collect()
    }

    #[test]
    fn test_open_without_frames_fails() {
        let mut cam = ReplayCamera::new(Vec::new(), Arc::new(MarkingSink::default()));
        assert!(matches!(
            cam.open(CameraFacing::Back),
            Err(CameraError::Open(_))
        ));
        assert!(!cam.is_open());
    }

    #[test]
    fn test_replay_delivers_and_presents_every_frame() {
        let out = tempfile::tempdir().unwrap();
        let sink = Arc::new(MarkingSink::default());
        let mut cam = ReplayCamera::new(frames(3), sink.clone());
        let window = cam.resolve_window(out.path()).unwrap();
        cam.set_window(window).unwrap();

        cam.open(CameraFacing::Back).unwrap();
        cam.wait_until_finished();

        assert_eq!(sink.calls.load(Ordering::Relaxed), 3);
        assert_eq!(cam.frames_delivered(), 3);
        assert_eq!(cam.frames_presented(), 3);
        let written = image::open(out.path().join("frame_00002.png"))
            .unwrap()
            .to_rgb8();
        // The sink's mark made it to the presented frame
        assert_eq!(written.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_frames_without_window_are_not_presented() {
        let mut cam = ReplayCamera::new(frames(2), Arc::new(MarkingSink::default()));
        cam.open(CameraFacing::Back).unwrap();
        cam.wait_until_finished();
        assert_eq!(cam.frames_delivered(), 2);
        assert_eq!(cam.frames_presented(), 0);
    }

    #[test]
    fn test_front_camera_is_mirrored() {
        let out = tempfile::tempdir().unwrap();
        let mut source = RgbImage::new(2, 1);
        source.put_pixel(1, 0, image::Rgb([0, 0, 200]));
        let mut cam = ReplayCamera::new(vec![source], Arc::new(NoopSink));
        let window = cam.resolve_window(out.path()).unwrap();
        cam.set_window(window).unwrap();
        cam.open(CameraFacing::Front).unwrap();
        cam.wait_until_finished();
        let written = image::open(out.path().join("frame_00000.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(written.get_pixel(0, 0).0, [0, 0, 200]);
    }

    #[rstest::rstest]
    #[case(0.0, Duration::ZERO)]
    #[case(-5.0, Duration::ZERO)]
    #[case(f64::NAN, Duration::ZERO)]
    #[case(f64::INFINITY, Duration::ZERO)]
    #[case(1e-30, Duration::ZERO)]
    #[case(f64::MIN_POSITIVE, Duration::ZERO)]
    #[case(4.0, Duration::from_millis(250))]
    fn test_frame_interval_from_fps(#[case] fps: f64, #[case] expected: Duration) {
        let cam = ReplayCamera::new(frames(1), Arc::new(NoopSink)).with_fps(fps);
        assert_eq!(cam.frame_interval, expected);
    }

    #[test]
    fn test_close_stops_looping_replay() {
        let mut cam = ReplayCamera::new(frames(2), Arc::new(MarkingSink::default()))
            .with_fps(500.0)
            .looping(true);
        cam.open(CameraFacing::Back).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        cam.close();
        assert!(!cam.is_open());
        let delivered = cam.frames_delivered();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cam.frames_delivered(), delivered);
        cam.close();
    }

    #[test]
    fn test_resolve_window_requires_directory() {
        let cam = ReplayCamera::new(frames(1), Arc::new(NoopSink));
        let dir = tempfile::tempdir().unwrap();
        assert!(cam.resolve_window(dir.path()).is_some());
        assert!(cam.resolve_window(&dir.path().join("missing")).is_none());
    }

    struct NoopSink;

    impl FrameSink for NoopSink {
        fn on_frame(&self, _frame: &mut FrameBuffer) {}
    }
}
