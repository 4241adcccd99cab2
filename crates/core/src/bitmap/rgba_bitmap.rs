use crate::bitmap::host_bitmap::{Bitmap, BitmapFormat, BitmapInfo};
use crate::error::BitmapError;

/// Owned in-memory bitmap, used by the desktop driver and in tests.
///
/// Tracks lock and unlock calls so callers can check that every lock is
/// balanced.
#[derive(Clone, Debug)]
pub struct RgbaBitmap {
    info: BitmapInfo,
    pixels: Vec<u8>,
    locked: bool,
    lock_count: usize,
    unlock_count: usize,
    refuse_lock: bool,
}

impl RgbaBitmap {
    /// Opaque black bitmap of `width x height`.
    pub fn new(width: u32, height: u32) -> Self {
        let pixels = [0, 0, 0, 255].repeat(width as usize * height as usize);
        Self::from_rgba(width, height, pixels)
    }

    /// Wraps tightly packed RGBA pixels.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            info: BitmapInfo {
                width,
                height,
                stride: width * 4,
                format: BitmapFormat::Rgba8888,
            },
            pixels,
            locked: false,
            lock_count: 0,
            unlock_count: 0,
            refuse_lock: false,
        }
    }

    pub fn from_image(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw())
    }

    pub fn into_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.info.width, self.info.height, self.pixels)
    }

    /// Reports `format` from `info()` while keeping the same bytes.
    pub fn with_format(mut self, format: BitmapFormat) -> Self {
        self.info.format = format;
        self
    }

    /// Makes every `lock_pixels` call fail.
    pub fn refusing_lock(mut self) -> Self {
        self.refuse_lock = true;
        self
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock_count(&self) -> usize {
        self.lock_count
    }

    pub fn unlock_count(&self) -> usize {
        self.unlock_count
    }
}

impl Bitmap for RgbaBitmap {
    fn info(&self) -> Result<BitmapInfo, BitmapError> {
        Ok(self.info)
    }

    fn lock_pixels(&mut self) -> Result<(), BitmapError> {
        if self.refuse_lock || self.locked {
            return Err(BitmapError::Lock);
        }
        self.locked = true;
        self.lock_count += 1;
        Ok(())
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    fn unlock_pixels(&mut self) {
        self.locked = false;
        self.unlock_count += 1;
    }
}
