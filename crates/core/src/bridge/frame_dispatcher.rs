use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::bridge::dispatch_logger::{DispatchLogger, NullDispatchLogger};
use crate::bridge::proximity::{ProximityMonitor, ProximityZone};
use crate::camera::domain::frame_sink::FrameSink;
use crate::detection::registry::{DetectorRegistry, RegistryGuard};
use crate::error::BridgeError;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::shared::detection::{Detection, DetectionResult, DetectorKind};
use crate::shared::frame::FrameBuffer;

/// What happened to one dispatched frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    /// Kinds whose detect and draw both succeeded, in run order.
    pub ran: Vec<DetectorKind>,
    /// Kinds in the dispatch order that had no loaded detector.
    pub skipped: Vec<DetectorKind>,
    /// Kinds whose detect or draw failed.
    pub failed: Vec<DetectorKind>,
    pub detections: usize,
    pub zone: Option<ProximityZone>,
}

/// Runs detect then draw for `kind` on `frame`, with the registry lock held
/// by the caller.
pub(crate) fn detect_and_draw(
    guard: &mut RegistryGuard<'_>,
    renderer: &dyn OverlayRenderer,
    kind: DetectorKind,
    frame: &mut FrameBuffer,
) -> Result<DetectionResult, BridgeError> {
    let detector = guard.get_mut(kind).ok_or(BridgeError::NotLoaded(kind))?;
    let result = detector
        .detect(frame)
        .map_err(|source| BridgeError::Detection { kind, source })?;
    renderer
        .draw(kind, frame, &result)
        .map_err(|source| BridgeError::Detection { kind, source })?;
    Ok(result)
}

/// Per-frame entry point invoked on the camera's capture thread.
///
/// Holds the registry lock for the whole frame and runs every kind in the
/// configured order. One failing kind does not stop the others.
pub struct FrameDispatcher {
    registry: Arc<DetectorRegistry>,
    renderer: Arc<dyn OverlayRenderer>,
    proximity: Arc<ProximityMonitor>,
    order: Vec<DetectorKind>,
    logger: Mutex<Box<dyn DispatchLogger>>,
    frame_index: AtomicU64,
}

impl FrameDispatcher {
    pub fn new(
        registry: Arc<DetectorRegistry>,
        renderer: Arc<dyn OverlayRenderer>,
        proximity: Arc<ProximityMonitor>,
        order: Vec<DetectorKind>,
    ) -> Self {
        let mut unique = Vec::with_capacity(order.len());
        for kind in order {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        Self {
            registry,
            renderer,
            proximity,
            order: unique,
            logger: Mutex::new(Box::new(NullDispatchLogger)),
            frame_index: AtomicU64::new(0),
        }
    }

    pub fn set_logger(&self, logger: Box<dyn DispatchLogger>) {
        *self.logger.lock().unwrap_or_else(PoisonError::into_inner) = logger;
    }

    pub fn order(&self) -> &[DetectorKind] {
        &self.order
    }

    pub fn frames_dispatched(&self) -> u64 {
        self.frame_index.load(Ordering::Relaxed)
    }

    /// Validates the frame, then runs detect and draw for each loaded kind.
    ///
    /// An invalid frame is rejected before the registry is touched, so it
    /// has no side effects at all.
    pub fn dispatch(&self, frame: &mut FrameBuffer) -> Result<DispatchReport, BridgeError> {
        frame.validate()?;
        let index = self.frame_index.fetch_add(1, Ordering::Relaxed);
        let frame_start = Instant::now();

        let mut report = DispatchReport::default();
        let mut objects: Vec<Detection> = Vec::new();
        let mut timings: Vec<(DetectorKind, f64)> = Vec::with_capacity(self.order.len());

        let mut guard = self.registry.lock();
        for &kind in &self.order {
            let start = Instant::now();
            match detect_and_draw(&mut guard, self.renderer.as_ref(), kind, frame) {
                Ok(result) => {
                    timings.push((kind, start.elapsed().as_secs_f64() * 1000.0));
                    objects.extend(result.objects);
                    report.ran.push(kind);
                }
                Err(BridgeError::NotLoaded(_)) => {
                    log::debug!("Frame {index}: {kind} detector not loaded, skipping");
                    report.skipped.push(kind);
                }
                Err(e) => {
                    e.log("on_frame");
                    report.failed.push(kind);
                }
            }
        }
        report.detections = objects.len();
        report.zone = Some(self.proximity.update(&objects, frame.height() as f32));
        drop(guard);

        let mut logger = self.logger.lock().unwrap_or_else(PoisonError::into_inner);
        logger.frame(index);
        for (kind, ms) in timings {
            logger.timing(kind.as_str(), ms);
        }
        logger.timing("frame", frame_start.elapsed().as_secs_f64() * 1000.0);
        logger.metric("detections", report.detections as f64);

        Ok(report)
    }

    pub fn log_summary(&self) {
        self.logger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary();
    }
}

impl FrameSink for FrameDispatcher {
    fn on_frame(&self, frame: &mut FrameBuffer) {
        if let Err(e) = self.dispatch(frame) {
            e.log("on_frame");
        }
    }
}
