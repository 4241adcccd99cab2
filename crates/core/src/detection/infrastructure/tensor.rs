use ndarray::Array4;

use crate::shared::frame::FrameBuffer;

/// Channel order of the model input tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorOrder {
    Rgb,
    Bgr,
}

/// Per-channel normalization applied as `(value - mean) * scale`, with
/// channels given in tensor order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalization {
    pub order: TensorOrder,
    pub mean: [f32; 3],
    pub scale: [f32; 3],
}

impl Normalization {
    /// RGB scaled to `[0, 1]`.
    pub const UNIT_RGB: Normalization = Normalization {
        order: TensorOrder::Rgb,
        mean: [0.0; 3],
        scale: [1.0 / 255.0; 3],
    };

    /// BGR with ImageNet-style mean subtraction, as used by Pelee-family models.
    pub const PELEE_BGR: Normalization = Normalization {
        order: TensorOrder::Bgr,
        mean: [103.94, 116.78, 123.68],
        scale: [0.017; 3],
    };
}

/// Resize `frame` to `size x size` (nearest neighbour) into an NCHW float tensor.
///
/// The frame must already be validated. Any source layout is accepted.
pub fn to_nchw(frame: &FrameBuffer, size: u32, norm: &Normalization) -> Array4<f32> {
    let src = frame.data();
    let layout = frame.layout();
    let channels = frame.channels();
    let src_w = frame.width().max(1) as usize;
    let src_h = frame.height().max(1) as usize;
    let s = size as usize;

    let mut tensor = Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            let [r, g, b] = layout.read_rgb(src, (src_y * src_w + src_x) * channels);
            let ordered = match norm.order {
                TensorOrder::Rgb => [r, g, b],
                TensorOrder::Bgr => [b, g, r],
            };
            for c in 0..3 {
                tensor[[0, c, y, x]] = (ordered[c] as f32 - norm.mean[c]) * norm.scale[c];
            }
        }
    }

    tensor
}
