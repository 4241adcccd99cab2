use std::ffi::c_void;
use std::ptr::NonNull;

use mome_vision_core::camera::domain::camera_device::{CameraDevice, CameraFacing};
use mome_vision_core::error::CameraError;

/// Camera operations supplied by the host.
///
/// `user_data` is passed back unchanged to every callback. The host must
/// keep it valid until the bridge is destroyed and must tolerate calls from
/// any thread.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MomeCameraCallbacks {
    pub user_data: *mut c_void,
    /// Starts capture; returns `false` on failure. `facing` is 0 front, 1 back.
    pub open: Option<unsafe extern "C" fn(user_data: *mut c_void, facing: i32) -> bool>,
    pub close: Option<unsafe extern "C" fn(user_data: *mut c_void)>,
    /// Turns a host surface into a native window, or null.
    pub resolve_window:
        Option<unsafe extern "C" fn(user_data: *mut c_void, surface: *mut c_void) -> *mut c_void>,
    pub set_window: Option<unsafe extern "C" fn(user_data: *mut c_void, window: *mut c_void) -> bool>,
}

/// Non-null host surface handle.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceHandle(NonNull<c_void>);

impl SurfaceHandle {
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }
}

/// Native window resolved from a surface.
#[derive(Debug)]
pub struct WindowHandle(NonNull<c_void>);

// SAFETY: the window is an opaque token the host resolved for us; we only
// hand it back to the host's own callbacks.
unsafe impl Send for WindowHandle {}

/// Camera collaborator backed by host callbacks.
pub struct HostCamera {
    callbacks: MomeCameraCallbacks,
}

// SAFETY: the callback contract requires the host to accept calls from any
// thread, and `user_data` is never dereferenced on this side.
unsafe impl Send for HostCamera {}

impl HostCamera {
    /// Returns `None` unless every callback is present.
    pub fn new(callbacks: MomeCameraCallbacks) -> Option<Self> {
        let complete = callbacks.open.is_some()
            && callbacks.close.is_some()
            && callbacks.resolve_window.is_some()
            && callbacks.set_window.is_some();
        complete.then_some(Self { callbacks })
    }
}

impl CameraDevice for HostCamera {
    type Surface = SurfaceHandle;
    type Window = WindowHandle;

    fn open(&mut self, facing: CameraFacing) -> Result<(), CameraError> {
        let open = self
            .callbacks
            .open
            .ok_or_else(|| CameraError::Open("no open callback".into()))?;
        // SAFETY: host contract on `MomeCameraCallbacks`.
        let opened = unsafe { open(self.callbacks.user_data, facing.id()) };
        if opened {
            Ok(())
        } else {
            Err(CameraError::Open(format!(
                "host camera refused to open ({facing:?} facing)"
            )))
        }
    }

    fn close(&mut self) {
        if let Some(close) = self.callbacks.close {
            // SAFETY: host contract on `MomeCameraCallbacks`.
            unsafe { close(self.callbacks.user_data) };
        }
    }

    fn resolve_window(&self, surface: &SurfaceHandle) -> Option<WindowHandle> {
        let resolve = self.callbacks.resolve_window?;
        // SAFETY: host contract on `MomeCameraCallbacks`.
        let window = unsafe { resolve(self.callbacks.user_data, surface.0.as_ptr()) };
        NonNull::new(window).map(WindowHandle)
    }

    fn set_window(&mut self, window: WindowHandle) -> Result<(), CameraError> {
        let set_window = self
            .callbacks
            .set_window
            .ok_or_else(|| CameraError::Window("no set_window callback".into()))?;
        // SAFETY: host contract on `MomeCameraCallbacks`.
        if unsafe { set_window(self.callbacks.user_data, window.0.as_ptr()) } {
            Ok(())
        } else {
            Err(CameraError::Window("host rejected the output window".into()))
        }
    }
}
