use crate::bitmap::host_bitmap::BitmapInfo;

/// Packs strided RGBA rows into a tightly packed RGB buffer.
///
/// `pixels` must hold at least `info.required_len()` bytes.
pub fn rgba_to_rgb(pixels: &[u8], info: &BitmapInfo) -> Vec<u8> {
    let (w, h, stride) = (info.width as usize, info.height as usize, info.stride as usize);
    let mut rgb = Vec::with_capacity(w * h * 3);
    for y in 0..h {
        let row = &pixels[y * stride..y * stride + w * 4];
        for px in row.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
    }
    rgb
}

/// Writes packed RGB back into strided RGBA rows, keeping each pixel's alpha.
pub fn rgb_into_rgba(rgb: &[u8], pixels: &mut [u8], info: &BitmapInfo) {
    let (w, h, stride) = (info.width as usize, info.height as usize, info.stride as usize);
    for y in 0..h {
        let row = &mut pixels[y * stride..y * stride + w * 4];
        let src = &rgb[y * w * 3..(y + 1) * w * 3];
        for (dst, px) in row.chunks_exact_mut(4).zip(src.chunks_exact(3)) {
            dst[..3].copy_from_slice(px);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::host_bitmap::BitmapFormat;

    fn info(width: u32, height: u32, stride: u32) -> BitmapInfo {
        BitmapInfo {
            width,
            height,
            stride,
            format: BitmapFormat::Rgba8888,
        }
    }

    #[test]
    fn test_rgba_to_rgb_drops_alpha() {
        let pixels = [1, 2, 3, 255, 4, 5, 6, 128];
        assert_eq!(rgba_to_rgb(&pixels, &info(2, 1, 8)), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_rgba_to_rgb_skips_row_padding() {
        // 1x2 bitmap with 4 bytes of padding per row
        let pixels = [1, 2, 3, 9, 0xEE, 0xEE, 0xEE, 0xEE, 4, 5, 6, 9];
        assert_eq!(rgba_to_rgb(&pixels, &info(1, 2, 8)), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_rgb_into_rgba_preserves_alpha_and_padding() {
        let mut pixels = [0, 0, 0, 77, 0xEE, 0xEE, 0xEE, 0xEE, 0, 0, 0, 33];
        rgb_into_rgba(&[1, 2, 3, 4, 5, 6], &mut pixels, &info(1, 2, 8));
        assert_eq!(pixels, [1, 2, 3, 77, 0xEE, 0xEE, 0xEE, 0xEE, 4, 5, 6, 33]);
    }

    #[test]
    fn test_round_trip_is_identity() {
        let original: Vec<u8> = (0..3 * 2 * 4).map(|i| i as u8).collect();
        let mut pixels = original.clone();
        let rgb = rgba_to_rgb(&pixels, &info(3, 2, 12));
        rgb_into_rgba(&rgb, &mut pixels, &info(3, 2, 12));
        assert_eq!(pixels, original);
    }
}
