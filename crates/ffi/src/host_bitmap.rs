use std::ffi::c_void;
use std::ptr::NonNull;

use mome_vision_core::bitmap::host_bitmap::{Bitmap, BitmapFormat, BitmapInfo};
use mome_vision_core::error::BitmapError;

/// Bitmap geometry as reported by the host.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct MomeBitmapInfo {
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub stride: u32,
    /// Android bitmap format code; 1 is RGBA_8888.
    pub format: i32,
}

/// Access to one host bitmap for the duration of a call.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MomeBitmapCallbacks {
    pub user_data: *mut c_void,
    /// Fills `out`; returns `false` if the info is unavailable.
    pub info: Option<unsafe extern "C" fn(user_data: *mut c_void, out: *mut MomeBitmapInfo) -> bool>,
    /// Pins the pixels and returns their address, or null on failure.
    pub lock_pixels: Option<unsafe extern "C" fn(user_data: *mut c_void) -> *mut u8>,
    pub unlock_pixels: Option<unsafe extern "C" fn(user_data: *mut c_void)>,
}

/// [`Bitmap`] over host callbacks. Pixels are only reachable while locked.
pub struct RawBitmap {
    callbacks: MomeBitmapCallbacks,
    locked: Option<(NonNull<u8>, usize)>,
}

impl RawBitmap {
    pub fn new(callbacks: MomeBitmapCallbacks) -> Self {
        Self {
            callbacks,
            locked: None,
        }
    }
}

impl Bitmap for RawBitmap {
    fn info(&self) -> Result<BitmapInfo, BitmapError> {
        let info_fn = self.callbacks.info.ok_or(BitmapError::Info)?;
        let mut raw = MomeBitmapInfo::default();
        // SAFETY: host contract on `MomeBitmapCallbacks`; `raw` outlives the call.
        if !unsafe { info_fn(self.callbacks.user_data, &mut raw) } {
            return Err(BitmapError::Info);
        }
        Ok(BitmapInfo {
            width: raw.width,
            height: raw.height,
            stride: raw.stride,
            format: BitmapFormat::from_code(raw.format),
        })
    }

    fn lock_pixels(&mut self) -> Result<(), BitmapError> {
        if self.locked.is_some() {
            return Err(BitmapError::Lock);
        }
        let len = self.info()?.required_len();
        let lock = self.callbacks.lock_pixels.ok_or(BitmapError::Lock)?;
        // SAFETY: host contract on `MomeBitmapCallbacks`.
        let ptr = NonNull::new(unsafe { lock(self.callbacks.user_data) }).ok_or(BitmapError::Lock)?;
        self.locked = Some((ptr, len));
        Ok(())
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        match self.locked {
            // SAFETY: a successful lock pins `len` bytes at `ptr` until unlock,
            // and `&mut self` keeps this the only view.
            Some((ptr, len)) => unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) },
            None => &mut [],
        }
    }

    fn unlock_pixels(&mut self) {
        if self.locked.take().is_some() {
            if let Some(unlock) = self.callbacks.unlock_pixels {
                // SAFETY: host contract on `MomeBitmapCallbacks`.
                unsafe { unlock(self.callbacks.user_data) };
            }
        }
    }
}
