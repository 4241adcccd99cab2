//! C ABI of the mome vision bridge.
//!
//! The host creates one opaque [`MomeBridge`] per camera pipeline and passes
//! it to every call. Each entry point checks its pointers, catches panics, and
//! reports failure as `false` (or null) instead of unwinding into the host.

#![allow(clippy::missing_safety_doc)]

pub mod host_bitmap;
pub mod host_camera;

use std::ffi::{c_char, c_void, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Once;

use mome_vision_core::bridge::vision_bridge::VisionBridge;
use mome_vision_core::camera::domain::frame_sink::FrameSink;
use mome_vision_core::detection::infrastructure::directory_asset_source::DirectoryAssetSource;
use mome_vision_core::detection::infrastructure::onnx_detector_factory::OnnxDetectorFactory;
use mome_vision_core::error::BridgeError;
use mome_vision_core::shared::detection::{Accelerator, DetectorKind};
use mome_vision_core::shared::frame::FrameBuffer;
use mome_vision_core::shared::pixel_format::PixelLayout;
use mome_vision_core::shared::settings::BridgeSettings;

use crate::host_bitmap::{MomeBitmapCallbacks, RawBitmap};
use crate::host_camera::{HostCamera, MomeCameraCallbacks, SurfaceHandle};

static LOGGER: Once = Once::new();

/// Opaque bridge handle owned by the host.
pub struct MomeBridge {
    bridge: VisionBridge<HostCamera>,
}

// --- Boundary helpers ---

fn init_logging() {
    LOGGER.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        // The host may already have installed a logger.
        let _ = env_logger::Builder::from_env(env).try_init();
    });
}

fn guarded<T>(op: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            log::error!("{op}: panicked, reporting failure");
            fallback
        }
    }
}

/// Resolves the handle and runs `f`, reporting `false` for a null handle.
unsafe fn with_bridge(
    op: &str,
    handle: *const MomeBridge,
    f: impl FnOnce(&VisionBridge<HostCamera>) -> Result<bool, BridgeError>,
) -> bool {
    guarded(op, false, || {
        let Some(handle) = (unsafe { handle.as_ref() }) else {
            log::error!("{op}: bridge handle is null");
            return false;
        };
        match f(&handle.bridge) {
            Ok(ok) => ok,
            Err(e) => {
                e.log(op);
                false
            }
        }
    })
}

unsafe fn path_arg(ptr: *const c_char, what: &str) -> Result<PathBuf, BridgeError> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidInput(format!("{what} is null")));
    }
    let text = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| BridgeError::InvalidInput(format!("{what} is not valid UTF-8")))?;
    Ok(PathBuf::from(text))
}

// --- Lifecycle ---

/// Creates a bridge. `settings_path` may be null for defaults; `camera` may
/// be null when the host has no camera. Returns null on failure.
#[no_mangle]
pub unsafe extern "C" fn mome_bridge_create(
    settings_path: *const c_char,
    camera: *const MomeCameraCallbacks,
) -> *mut MomeBridge {
    init_logging();
    guarded("create", std::ptr::null_mut(), || {
        let settings = if settings_path.is_null() {
            BridgeSettings::default()
        } else {
            match unsafe { path_arg(settings_path, "settings path") } {
                Ok(path) => BridgeSettings::load_or_default(&path),
                Err(e) => {
                    e.log("create");
                    return std::ptr::null_mut();
                }
            }
        };
        let bridge = VisionBridge::new(settings, Box::new(OnnxDetectorFactory::new()));
        if let Some(callbacks) = unsafe { camera.as_ref() } {
            match HostCamera::new(*callbacks) {
                Some(host) => {
                    bridge.attach_camera(host);
                }
                None => log::warn!("create: camera callbacks incomplete, camera disabled"),
            }
        }
        log::info!("Bridge created");
        Box::into_raw(Box::new(MomeBridge { bridge }))
    })
}

/// Closes the camera, releases every detector and frees the handle.
#[no_mangle]
pub unsafe extern "C" fn mome_bridge_destroy(handle: *mut MomeBridge) {
    if handle.is_null() {
        return;
    }
    guarded("destroy", (), || {
        let owned = unsafe { Box::from_raw(handle) };
        owned.bridge.teardown();
        log::info!("Bridge destroyed");
    });
}

// --- Detectors ---

#[no_mangle]
pub unsafe extern "C" fn mome_bridge_load_detector(
    handle: *const MomeBridge,
    kind_id: i32,
    asset_dir: *const c_char,
    accelerator_id: i32,
) -> bool {
    with_bridge("load_detector", handle, |bridge| {
        let kind = DetectorKind::from_id(kind_id)?;
        let accelerator = Accelerator::from_id(accelerator_id)?;
        let dir = unsafe { path_arg(asset_dir, "asset directory") }?;
        Ok(bridge.load_detector(kind, &DirectoryAssetSource::new(dir), accelerator))
    })
}

#[no_mangle]
pub unsafe extern "C" fn mome_bridge_load_segmentation_model(
    handle: *const MomeBridge,
    asset_dir: *const c_char,
) -> bool {
    with_bridge("load_segmentation_model", handle, |bridge| {
        let dir = unsafe { path_arg(asset_dir, "asset directory") }?;
        Ok(bridge.load_segmentation_model(&DirectoryAssetSource::new(dir)))
    })
}

/// Detects and draws on a host bitmap in place.
#[no_mangle]
pub unsafe extern "C" fn mome_bridge_detect(
    handle: *const MomeBridge,
    kind_id: i32,
    bitmap: *const MomeBitmapCallbacks,
) -> bool {
    with_bridge("detect", handle, |bridge| {
        let kind = DetectorKind::from_id(kind_id)?;
        let callbacks = unsafe { bitmap.as_ref() }
            .ok_or_else(|| BridgeError::InvalidInput("bitmap is null".into()))?;
        let mut raw = RawBitmap::new(*callbacks);
        Ok(bridge.detect_on_image(kind, &mut raw))
    })
}

// --- Camera ---

#[no_mangle]
pub unsafe extern "C" fn mome_bridge_open_camera(handle: *const MomeBridge) -> bool {
    with_bridge("open_camera", handle, |bridge| Ok(bridge.open_camera()))
}

#[no_mangle]
pub unsafe extern "C" fn mome_bridge_close_camera(handle: *const MomeBridge) -> bool {
    with_bridge("close_camera", handle, |bridge| Ok(bridge.close_camera()))
}

#[no_mangle]
pub unsafe extern "C" fn mome_bridge_set_output_window(
    handle: *const MomeBridge,
    surface: *mut c_void,
) -> bool {
    with_bridge("set_output_window", handle, |bridge| {
        let surface = SurfaceHandle::new(surface);
        Ok(bridge.set_output_window(surface.as_ref()))
    })
}

#[no_mangle]
pub unsafe extern "C" fn mome_bridge_is_warn(handle: *const MomeBridge) -> bool {
    with_bridge("is_warn", handle, |bridge| Ok(bridge.is_warn()))
}

/// Frame callback for the host camera thread. `pixels` holds `len` bytes of
/// tightly packed RGB.
#[no_mangle]
pub unsafe extern "C" fn mome_bridge_on_frame(
    handle: *const MomeBridge,
    pixels: *mut u8,
    len: usize,
    width: i32,
    height: i32,
) {
    with_bridge("on_frame", handle, |bridge| {
        if pixels.is_null() {
            return Err(BridgeError::InvalidInput("frame pixels are null".into()));
        }
        // SAFETY: the host lends `len` writable bytes for the duration of the call.
        let data = unsafe { std::slice::from_raw_parts_mut(pixels, len) };
        let mut frame = FrameBuffer::new(data, width, height, PixelLayout::Rgb);
        bridge.dispatcher().on_frame(&mut frame);
        Ok(true)
    });
}
