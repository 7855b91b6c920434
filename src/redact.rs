use image::{imageops, DynamicImage, Rgb, RgbImage};

use crate::config::{LabelConfig, RedactionConfig};
use crate::font::FontFace;

const MARGIN: i32 = 10;
const MIN_TITLE_PX: u32 = 20;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const LIGHT_GRAY: Rgb<u8> = Rgb([211, 211, 211]);
const DARK_GRAY: Rgb<u8> = Rgb([169, 169, 169]);

/// Rectangle anchored at the image origin that hides residual identifying text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedactionRegion {
    pub width: u32,
    pub height: u32,
}

impl RedactionRegion {
    /// Fractions are expected in (0, 1]; each side is floored and kept within `[1, side]`.
    pub fn compute(image_width: u32, image_height: u32, width_fraction: f32, height_fraction: f32) -> Self {
        Self {
            width: scaled_side(image_width, width_fraction),
            height: scaled_side(image_height, height_fraction),
        }
    }
}

fn scaled_side(side: u32, fraction: f32) -> u32 {
    let scaled = (side as f64 * fraction as f64).floor() as u32;
    scaled.max(1).min(side)
}

/// Black out the configured top-left region and label it.
///
/// Always returns a fresh RGB copy; the input is never modified.
pub fn redact(image: &DynamicImage, config: &RedactionConfig, font: &FontFace) -> (RgbImage, RedactionRegion) {
    let mut canvas = image.to_rgb8();
    let region = RedactionRegion::compute(
        canvas.width(),
        canvas.height(),
        config.width_fraction,
        config.height_fraction,
    );

    // Text is rendered onto the patch itself so nothing spills over the tracing.
    let mut patch = RgbImage::from_pixel(region.width, region.height, BLACK);
    if let Some(label) = &config.label {
        draw_label(&mut patch, label, font);
    }
    imageops::replace(&mut canvas, &patch, 0, 0);

    (canvas, region)
}

fn draw_label(patch: &mut RgbImage, label: &LabelConfig, font: &FontFace) {
    let title_px = MIN_TITLE_PX.max((patch.height() as f32 * 0.08) as u32) as i32;
    let sub_px = (title_px as f32 * 0.6) as i32;
    let item_step = (title_px as f32 * 0.5) as i32 + 2;

    let mut y = MARGIN;
    font.draw(patch, WHITE, MARGIN, y, title_px as f32, &label.title);
    y += title_px + 5;
    font.draw(patch, LIGHT_GRAY, MARGIN, y, sub_px as f32, &label.subtitle);
    y += sub_px + 10;
    for item in &label.items {
        font.draw(patch, DARK_GRAY, MARGIN, y, sub_px as f32, item);
        y += item_step;
    }
}
