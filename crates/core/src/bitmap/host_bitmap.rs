use crate::error::BitmapError;

/// Pixel format codes as reported by the host's bitmap info call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitmapFormat {
    None,
    Rgba8888,
    Rgb565,
    Rgba4444,
    A8,
    RgbaF16,
    Rgba1010102,
    Unknown(i32),
}

impl BitmapFormat {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => BitmapFormat::None,
            1 => BitmapFormat::Rgba8888,
            4 => BitmapFormat::Rgb565,
            7 => BitmapFormat::Rgba4444,
            8 => BitmapFormat::A8,
            9 => BitmapFormat::RgbaF16,
            10 => BitmapFormat::Rgba1010102,
            other => BitmapFormat::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            BitmapFormat::None => 0,
            BitmapFormat::Rgba8888 => 1,
            BitmapFormat::Rgb565 => 4,
            BitmapFormat::Rgba4444 => 7,
            BitmapFormat::A8 => 8,
            BitmapFormat::RgbaF16 => 9,
            BitmapFormat::Rgba1010102 => 10,
            BitmapFormat::Unknown(code) => code,
        }
    }
}

/// Geometry and format of a host bitmap. `stride` is bytes per row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapInfo {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: BitmapFormat,
}

impl BitmapInfo {
    /// Checks the bitmap is RGBA_8888 with positive dimensions and a row
    /// stride that fits a full row.
    pub fn validate_rgba(&self) -> Result<(), BitmapError> {
        if self.format != BitmapFormat::Rgba8888 {
            return Err(BitmapError::UnsupportedFormat(self.format.code()));
        }
        let row_bytes = (self.width as u64) * 4;
        if self.width == 0 || self.height == 0 || (self.stride as u64) < row_bytes {
            return Err(self.geometry_error());
        }
        Ok(())
    }

    /// Bytes spanned by the pixel rows: every full stride but the last row's padding.
    pub fn required_len(&self) -> usize {
        if self.height == 0 {
            return 0;
        }
        (self.height as usize - 1) * self.stride as usize + self.width as usize * 4
    }

    pub(crate) fn geometry_error(&self) -> BitmapError {
        BitmapError::Geometry {
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }
}

/// A host-owned bitmap whose pixels are only reachable while locked.
pub trait Bitmap {
    fn info(&self) -> Result<BitmapInfo, BitmapError>;

    fn lock_pixels(&mut self) -> Result<(), BitmapError>;

    /// Pixel memory. Only meaningful between `lock_pixels` and `unlock_pixels`.
    fn pixels_mut(&mut self) -> &mut [u8];

    fn unlock_pixels(&mut self);
}

/// Locked pixels of a bitmap. Unlocks when dropped, on every exit path.
pub struct PixelGuard<'b, B: Bitmap + ?Sized> {
    bitmap: &'b mut B,
}

impl<'b, B: Bitmap + ?Sized> PixelGuard<'b, B> {
    pub fn lock(bitmap: &'b mut B) -> Result<Self, BitmapError> {
        bitmap.lock_pixels()?;
        Ok(Self { bitmap })
    }

    pub fn pixels(&mut self) -> &mut [u8] {
        self.bitmap.pixels_mut()
    }
}

impl<B: Bitmap + ?Sized> Drop for PixelGuard<'_, B> {
    fn drop(&mut self) {
        self.bitmap.unlock_pixels();
    }
}
