use std::ops::{Deref, DerefMut};

use ab_glyph::{FontRef, PxScale};
use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect as PixelRect;

use crate::error::DetectError;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::rendering::infrastructure::palette::{label_color, text_color_for, FACE_COLOR};
use crate::shared::constants::{FACE_LABEL, VOC_LABELS};
use crate::shared::detection::{Detection, DetectionResult, DetectorKind, SegmentationMask};
use crate::shared::frame::FrameBuffer;
use crate::shared::pixel_format::PixelLayout;

/// Label font, embedded so the library ships without loose assets.
const LABEL_FONT: &[u8] = include_bytes!("../../../assets/DejaVuSansMono.ttf");

/// Default outline thickness in pixels.
const DEFAULT_THICKNESS: i32 = 2;

/// Default opacity of segmentation mask colours.
const DEFAULT_MASK_ALPHA: f32 = 0.5;

/// Frame height per unit of label scale.
const TEXT_SCALE_STEP: i32 = 240;

/// Label glyph height in pixels at scale 1.
const LABEL_FONT_PX: f32 = 12.0;

/// Draws boxes, label tabs and segmentation masks directly into the frame.
pub struct CpuOverlayRenderer {
    thickness: i32,
    mask_alpha: f32,
    font: Option<FontRef<'static>>,
}

impl CpuOverlayRenderer {
    pub fn new(thickness: i32, mask_alpha: f32) -> Self {
        let font = match FontRef::try_from_slice(LABEL_FONT) {
            Ok(font) => Some(font),
            Err(e) => {
                log::error!("Embedded label font is unreadable, labels disabled: {e}");
                None
            }
        };
        Self {
            thickness: thickness.max(1),
            mask_alpha: mask_alpha.clamp(0.0, 1.0),
            font,
        }
    }
}

impl Default for CpuOverlayRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_THICKNESS, DEFAULT_MASK_ALPHA)
    }
}

impl OverlayRenderer for CpuOverlayRenderer {
    fn draw(
        &self,
        kind: DetectorKind,
        frame: &mut FrameBuffer,
        result: &DetectionResult,
    ) -> Result<(), DetectError> {
        if result.is_empty() {
            return Ok(());
        }
        frame.validate()?;

        if let Some(mask) = &result.mask {
            blend_mask(frame, mask, self.mask_alpha);
        }
        if result.objects.is_empty() {
            return Ok(());
        }

        let width = frame.width() as u32;
        let height = frame.height() as u32;
        let len = frame.required_len().ok_or("frame has no pixels")?;
        let layout = frame.layout();
        match layout {
            PixelLayout::Rgb | PixelLayout::Bgr => {
                let pixels = &mut frame.data_mut()[..len];
                let mut view = ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(width, height, pixels)
                    .ok_or("frame does not fit its dimensions")?;
                self.annotate(&mut view, kind, &result.objects, layout);
            }
            PixelLayout::Rgba => {
                // Drawn on an RGB copy so alpha is never touched.
                let data = frame.data();
                let mut rgb = RgbImage::from_fn(width, height, |x, y| {
                    Rgb(layout.read_rgb(data, pixel_offset(x, y, width, layout)))
                });
                self.annotate(&mut rgb, kind, &result.objects, PixelLayout::Rgb);
                let data = frame.data_mut();
                for (x, y, px) in rgb.enumerate_pixels() {
                    layout.write_rgb(data, pixel_offset(x, y, width, layout), px.0);
                }
            }
        }
        Ok(())
    }
}

impl CpuOverlayRenderer {
    /// Outlines and labels every object. `order` is the byte order of
    /// `image`; colours are swizzled to match.
    fn annotate<C>(
        &self,
        image: &mut ImageBuffer<Rgb<u8>, C>,
        kind: DetectorKind,
        objects: &[Detection],
        order: PixelLayout,
    ) where
        C: Deref<Target = [u8]> + DerefMut,
    {
        let (width, height) = (image.width() as i32, image.height() as i32);
        let scale = (height.min(width) / TEXT_SCALE_STEP).clamp(1, 4);
        for det in objects {
            let color = match kind {
                DetectorKind::Face => FACE_COLOR,
                DetectorKind::Segmentation => label_color(det.label),
            };
            let Some(bounds) = box_bounds(det, width, height) else {
                continue;
            };
            for t in 0..self.thickness {
                let w = bounds.x2 - bounds.x1 + 1 - 2 * t;
                let h = bounds.y2 - bounds.y1 + 1 - 2 * t;
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = PixelRect::at(bounds.x1 + t, bounds.y1 + t).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(image, rect, swizzle(color, order));
            }

            let text = format!("{} {:.1}%", label_name(kind, det.label), det.score * 100.0);
            self.label_tab(image, bounds, &text, color, scale, order);
        }
    }

    /// Filled tab above the box (inside it when there is no room) holding `text`.
    fn label_tab<C>(
        &self,
        image: &mut ImageBuffer<Rgb<u8>, C>,
        bounds: Bounds,
        text: &str,
        color: [u8; 3],
        scale: i32,
        order: PixelLayout,
    ) where
        C: Deref<Target = [u8]> + DerefMut,
    {
        let Some(font) = &self.font else {
            return;
        };
        let (tab_w, tab_h) = label_extent(font, text, scale);
        let pad = 2 * scale;
        let tab_y = if bounds.y1 - tab_h >= 0 {
            bounds.y1 - tab_h
        } else {
            bounds.y1
        };
        let tab = PixelRect::at(bounds.x1, tab_y).of_size(tab_w as u32, tab_h as u32);
        draw_filled_rect_mut(image, tab, swizzle(color, order));
        draw_text_mut(
            image,
            swizzle(text_color_for(color), order),
            bounds.x1 + pad,
            tab_y + pad,
            label_scale(scale),
            font,
            text,
        );
    }
}

fn label_scale(scale: i32) -> PxScale {
    PxScale::from(LABEL_FONT_PX * scale as f32)
}

/// Size of the label tab for `text`, padding included.
fn label_extent(font: &FontRef<'_>, text: &str, scale: i32) -> (i32, i32) {
    let (w, h) = text_size(label_scale(scale), font, text);
    let pad = 2 * scale;
    (w as i32 + 2 * pad, h as i32 + 2 * pad)
}

fn swizzle([r, g, b]: [u8; 3], order: PixelLayout) -> Rgb<u8> {
    match order {
        PixelLayout::Bgr => Rgb([b, g, r]),
        PixelLayout::Rgb | PixelLayout::Rgba => Rgb([r, g, b]),
    }
}

fn pixel_offset(x: u32, y: u32, width: u32, layout: PixelLayout) -> usize {
    (y as usize * width as usize + x as usize) * layout.channels()
}

fn label_name(kind: DetectorKind, label: i32) -> &'static str {
    match kind {
        DetectorKind::Face => FACE_LABEL,
        DetectorKind::Segmentation => usize::try_from(label)
            .ok()
            .and_then(|i| VOC_LABELS.get(i))
            .copied()
            .unwrap_or("?"),
    }
}

/// Inclusive pixel bounds of a drawn box.
#[derive(Clone, Copy, Debug)]
struct Bounds {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

/// Box clipped to the frame. `None` when it is off-frame or degenerate.
fn box_bounds(det: &Detection, width: i32, height: i32) -> Option<Bounds> {
    let b = Bounds {
        x1: (det.rect.x.floor() as i32).clamp(0, width - 1),
        y1: (det.rect.y.floor() as i32).clamp(0, height - 1),
        x2: (det.rect.right().ceil() as i32 - 1).clamp(0, width - 1),
        y2: (det.rect.bottom().ceil() as i32 - 1).clamp(0, height - 1),
    };
    (b.x1 < b.x2 && b.y1 < b.y2).then_some(b)
}

/// Tints every non-background pixel with its class colour.
fn blend_mask(frame: &mut FrameBuffer, mask: &SegmentationMask, alpha: f32) {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let layout = frame.layout();
    let channels = frame.channels();
    let data = frame.data_mut();
    for y in 0..h {
        for x in 0..w {
            let class = mask.class_at(x, y, w, h);
            if class == 0 {
                continue;
            }
            let offset = (y * w + x) * channels;
            let base = layout.read_rgb(data, offset);
            let tint = label_color(class as i32);
            let mixed: [u8; 3] = std::array::from_fn(|c| {
                (base[c] as f32 * (1.0 - alpha) + tint[c] as f32 * alpha).round() as u8
            });
            layout.write_rgb(data, offset, mixed);
        }
    }
}
