/// Box colour used for every face detection.
pub const FACE_COLOR: [u8; 3] = [0, 255, 0];

/// Number of distinct hues handed out before colours repeat.
const HUES: usize = 21;

/// Stable colour for class `label`, spread evenly around the hue circle.
pub fn label_color(label: i32) -> [u8; 3] {
    let index = label.rem_euclid(HUES as i32) as f32;
    hsv_to_rgb(index / HUES as f32 * 360.0, 0.8, 0.9)
}

/// HSV to RGB. `h` in degrees `[0, 360)`, `s` and `v` in `[0, 1]`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ]
}

/// Luma-based choice of black or white text over `background`.
pub fn text_color_for(background: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = background.map(f32::from);
    if 0.299 * r + 0.587 * g + 0.114 * b > 128.0 {
        [0, 0, 0]
    } else {
        [255, 255, 255]
    }
}
