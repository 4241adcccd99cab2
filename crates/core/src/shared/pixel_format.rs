/// Channel order of a packed 8-bit frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    Rgb,
    Bgr,
    Rgba,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb | PixelLayout::Bgr => 3,
            PixelLayout::Rgba => 4,
        }
    }

    /// Byte offsets of the red, green and blue channels within one pixel.
    pub fn rgb_offsets(self) -> [usize; 3] {
        match self {
            PixelLayout::Rgb | PixelLayout::Rgba => [0, 1, 2],
            PixelLayout::Bgr => [2, 1, 0],
        }
    }

    /// Reads the pixel at `offset` as `[r, g, b]`.
    pub fn read_rgb(self, data: &[u8], offset: usize) -> [u8; 3] {
        let [r, g, b] = self.rgb_offsets();
        [data[offset + r], data[offset + g], data[offset + b]]
    }

    /// Writes `[r, g, b]` into the pixel at `offset`, leaving any alpha byte alone.
    pub fn write_rgb(self, data: &mut [u8], offset: usize, rgb: [u8; 3]) {
        let [r, g, b] = self.rgb_offsets();
        data[offset + r] = rgb[0];
        data[offset + g] = rgb[1];
        data[offset + b] = rgb[2];
    }
}
