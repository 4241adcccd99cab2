use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::bitmap::conversion::{rgb_into_rgba, rgba_to_rgb};
use crate::bitmap::host_bitmap::{Bitmap, PixelGuard};
use crate::bridge::dispatch_logger::DispatchLogger;
use crate::bridge::frame_dispatcher::{detect_and_draw, FrameDispatcher};
use crate::bridge::proximity::ProximityMonitor;
use crate::camera::domain::camera_device::CameraDevice;
use crate::camera::domain::frame_sink::FrameSink;
use crate::detection::domain::asset_source::AssetSource;
use crate::detection::domain::detector::DetectorFactory;
use crate::detection::registry::DetectorRegistry;
use crate::error::BridgeError;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::rendering::infrastructure::cpu_overlay_renderer::CpuOverlayRenderer;
use crate::shared::detection::{Accelerator, DetectorKind};
use crate::shared::frame::FrameBuffer;
use crate::shared::pixel_format::PixelLayout;
use crate::shared::settings::BridgeSettings;

/// Host-facing operations of the bridge.
///
/// Every operation reports success as a `bool` and logs the reason for a
/// failure. The `try_*` variants return the underlying [`BridgeError`] for
/// callers that want it.
pub struct VisionBridge<C: CameraDevice> {
    settings: BridgeSettings,
    registry: Arc<DetectorRegistry>,
    renderer: Arc<dyn OverlayRenderer>,
    proximity: Arc<ProximityMonitor>,
    dispatcher: Arc<FrameDispatcher>,
    camera: Mutex<Option<C>>,
}

impl<C: CameraDevice> VisionBridge<C> {
    pub fn new(settings: BridgeSettings, factory: Box<dyn DetectorFactory>) -> Self {
        Self::with_renderer(settings, factory, Arc::new(CpuOverlayRenderer::default()))
    }

    pub fn with_renderer(
        settings: BridgeSettings,
        factory: Box<dyn DetectorFactory>,
        renderer: Arc<dyn OverlayRenderer>,
    ) -> Self {
        let registry = Arc::new(DetectorRegistry::new(factory));
        let proximity = Arc::new(ProximityMonitor::new(settings.warning_enabled));
        let dispatcher = Arc::new(FrameDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&renderer),
            Arc::clone(&proximity),
            settings.dispatch_order.clone(),
        ));
        Self {
            settings,
            registry,
            renderer,
            proximity,
            dispatcher,
            camera: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<DetectorRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<FrameDispatcher> {
        &self.dispatcher
    }

    /// The sink a camera should deliver frames to.
    pub fn frame_sink(&self) -> Arc<dyn FrameSink> {
        self.dispatcher.clone()
    }

    pub fn set_dispatch_logger(&self, logger: Box<dyn DispatchLogger>) {
        self.dispatcher.set_logger(logger);
    }

    /// Installs the camera collaborator. A previously attached camera is
    /// closed and returned.
    pub fn attach_camera(&self, camera: C) -> Option<C> {
        let mut previous = self.camera_slot().replace(camera);
        if let Some(old) = previous.as_mut() {
            old.close();
        }
        previous
    }

    pub fn detach_camera(&self) -> Option<C> {
        let mut camera = self.camera_slot().take();
        if let Some(cam) = camera.as_mut() {
            cam.close();
        }
        camera
    }

    /// Runs `f` against the attached camera, if any.
    pub fn with_camera<R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        self.camera_slot().as_mut().map(f)
    }

    // --- Detector loading ---

    pub fn load_detector(
        &self,
        kind: DetectorKind,
        assets: &dyn AssetSource,
        accelerator: Accelerator,
    ) -> bool {
        report(
            "load_detector",
            self.try_load_detector(kind, assets, accelerator),
        )
    }

    pub fn try_load_detector(
        &self,
        kind: DetectorKind,
        assets: &dyn AssetSource,
        accelerator: Accelerator,
    ) -> Result<u64, BridgeError> {
        let config = self.settings.detector(kind).to_config(accelerator);
        self.registry
            .load(kind, assets, &config)
            .map_err(|source| BridgeError::LoadFailure { kind, source })
    }

    /// Loads the segmentation kind with the accelerator from the settings.
    pub fn load_segmentation_model(&self, assets: &dyn AssetSource) -> bool {
        let accelerator = self.settings.segmentation.accelerator;
        report(
            "load_segmentation_model",
            self.try_load_detector(DetectorKind::Segmentation, assets, accelerator),
        )
    }

    // --- Still-image detection ---

    pub fn detect_on_image<B: Bitmap + ?Sized>(&self, kind: DetectorKind, bitmap: &mut B) -> bool {
        report("detect", self.try_detect_on_image(kind, bitmap))
    }

    /// Detects and draws on a host bitmap in place.
    ///
    /// The bitmap is only written after detect and draw both succeed, so a
    /// failure leaves it untouched. The pixels are unlocked on every path.
    pub fn try_detect_on_image<B: Bitmap + ?Sized>(
        &self,
        kind: DetectorKind,
        bitmap: &mut B,
    ) -> Result<usize, BridgeError> {
        if !self.registry.is_loaded(kind) {
            return Err(BridgeError::NotLoaded(kind));
        }
        let info = bitmap.info()?;
        info.validate_rgba()?;

        let mut guard = PixelGuard::lock(bitmap)?;
        let pixels = guard.pixels();
        if pixels.len() < info.required_len() {
            return Err(BridgeError::Bitmap(info.geometry_error()));
        }

        let mut rgb = rgba_to_rgb(pixels, &info);
        let width = i32::try_from(info.width).map_err(|_| info.geometry_error())?;
        let height = i32::try_from(info.height).map_err(|_| info.geometry_error())?;

        let detections = {
            let mut frame = FrameBuffer::new(&mut rgb, width, height, PixelLayout::Rgb);
            let mut registry = self.registry.lock();
            let result = detect_and_draw(&mut registry, self.renderer.as_ref(), kind, &mut frame)?;
            result.objects.len()
        };

        rgb_into_rgba(&rgb, pixels, &info);
        log::debug!(
            "{kind} detection on {}x{} bitmap found {detections} objects",
            info.width,
            info.height
        );
        Ok(detections)
    }

    // --- Camera ---

    /// Opens the attached camera with the configured facing.
    pub fn open_camera(&self) -> bool {
        report("open_camera", self.try_open_camera())
    }

    pub fn try_open_camera(&self) -> Result<(), BridgeError> {
        let mut slot = self.camera_slot();
        let camera = slot
            .as_mut()
            .ok_or(BridgeError::CollaboratorUnavailable("camera"))?;
        self.proximity.reset();
        camera.open(self.settings.camera_facing)?;
        log::info!("Camera opened ({:?} facing)", self.settings.camera_facing);
        Ok(())
    }

    /// Closes the camera if one is attached. Always succeeds.
    pub fn close_camera(&self) -> bool {
        if let Some(camera) = self.camera_slot().as_mut() {
            camera.close();
        }
        self.proximity.reset();
        true
    }

    pub fn set_output_window(&self, surface: Option<&C::Surface>) -> bool {
        report("set_output_window", self.try_set_output_window(surface))
    }

    pub fn try_set_output_window(&self, surface: Option<&C::Surface>) -> Result<(), BridgeError> {
        let surface =
            surface.ok_or_else(|| BridgeError::InvalidInput("output surface is null".into()))?;
        let mut slot = self.camera_slot();
        let camera = slot
            .as_mut()
            .ok_or(BridgeError::CollaboratorUnavailable("camera"))?;
        let window = camera.resolve_window(surface).ok_or_else(|| {
            BridgeError::InvalidInput("surface does not resolve to a window".into())
        })?;
        camera.set_window(window)?;
        Ok(())
    }

    // --- Status and lifecycle ---

    pub fn is_warn(&self) -> bool {
        self.proximity.is_warn()
    }

    pub fn proximity(&self) -> &ProximityMonitor {
        &self.proximity
    }

    /// Closes the camera and releases every detector. Safe to call repeatedly.
    pub fn teardown(&self) {
        self.close_camera();
        self.registry.teardown();
        self.dispatcher.log_summary();
    }

    fn camera_slot(&self) -> MutexGuard<'_, Option<C>> {
        self.camera.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn report<T>(op: &str, result: Result<T, BridgeError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            e.log(op);
            false
        }
    }
}
