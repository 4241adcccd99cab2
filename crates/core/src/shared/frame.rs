use ndarray::{ArrayView3, ArrayViewMut3, ShapeError};

use crate::error::BridgeError;
use crate::shared::pixel_format::PixelLayout;

/// A borrowed, mutable pixel grid: packed bytes in row-major order.
///
/// The buffer belongs to whoever supplied it (camera collaborator or host
/// bitmap). A `FrameBuffer` lives for exactly one call and is never stored.
/// Dimensions are signed because they come straight from foreign callers;
/// call [`FrameBuffer::validate`] before trusting them.
#[derive(Debug)]
pub struct FrameBuffer<'a> {
    data: &'a mut [u8],
    width: i32,
    height: i32,
    layout: PixelLayout,
}

impl<'a> FrameBuffer<'a> {
    pub fn new(data: &'a mut [u8], width: i32, height: i32, layout: PixelLayout) -> Self {
        Self {
            data,
            width,
            height,
            layout,
        }
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Number of bytes the declared dimensions require, or `None` when a
    /// dimension is not positive.
    pub fn required_len(&self) -> Option<usize> {
        if self.width <= 0 || self.height <= 0 {
            return None;
        }
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.channels())
    }

    /// Checks that the buffer is non-empty, has positive dimensions and is
    /// large enough for them.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.data.is_empty() {
            return Err(BridgeError::InvalidInput("frame buffer is empty".into()));
        }
        let required = self.required_len().ok_or_else(|| {
            BridgeError::InvalidInput(format!(
                "invalid frame dimensions: {}x{}",
                self.width, self.height
            ))
        })?;
        if self.data.len() < required {
            return Err(BridgeError::InvalidInput(format!(
                "frame buffer holds {} bytes, {}x{} {:?} needs {}",
                self.data.len(),
                self.width,
                self.height,
                self.layout,
                required
            )));
        }
        Ok(())
    }

    pub fn as_ndarray(&self) -> Result<ArrayView3<'_, u8>, ShapeError> {
        let (shape, len) = self.shape_and_len()?;
        ArrayView3::from_shape(shape, &self.data[..len])
    }

    pub fn as_ndarray_mut(&mut self) -> Result<ArrayViewMut3<'_, u8>, ShapeError> {
        let (shape, len) = self.shape_and_len()?;
        ArrayViewMut3::from_shape(shape, &mut self.data[..len])
    }

    fn shape_and_len(&self) -> Result<((usize, usize, usize), usize), ShapeError> {
        let len = self
            .required_len()
            .filter(|&len| len <= self.data.len())
            .ok_or_else(|| ShapeError::from_kind(ndarray::ErrorKind::OutOfBounds))?;
        let shape = (self.height as usize, self.width as usize, self.channels());
        Ok((shape, len))
    }
}
