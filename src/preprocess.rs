//
// preprocess.rs
// Ecg-Dicom-Prep
//
// Prepares redacted pages for a vision model: color conversion, aspect-preserving fit, center padding and normalization.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Pixel, Rgb};
use ndarray::{ArrayD, IxDyn};
use ndarray_npy::write_npy;

use crate::config::{AiConfig, ColorMode};
use crate::error::PipelineError;

/// Numeric view of the AI canvas, `[h, w, 3]` for RGB or `[h, w]` for grayscale.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelArray {
    U8(ArrayD<u8>),
    /// Values divided by 255, in `[0, 1]`.
    F32(ArrayD<f32>),
}

impl PixelArray {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            PixelArray::U8(a) => a.shape().to_vec(),
            PixelArray::F32(a) => a.shape().to_vec(),
        }
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            PixelArray::U8(_) => "uint8",
            PixelArray::F32(_) => "float32",
        }
    }

    /// `(min, max)` over all elements.
    pub fn value_range(&self) -> (f32, f32) {
        let fold = |(lo, hi): (f32, f32), v: f32| (lo.min(v), hi.max(v));
        let init = (f32::INFINITY, f32::NEG_INFINITY);
        match self {
            PixelArray::U8(a) => a.iter().map(|&v| v as f32).fold(init, fold),
            PixelArray::F32(a) => a.iter().copied().fold(init, fold),
        }
    }

    /// Persist as a NumPy `.npy` file.
    pub fn write_npy(&self, path: &Path) -> Result<(), PipelineError> {
        let result = match self {
            PixelArray::U8(a) => write_npy(path, a),
            PixelArray::F32(a) => write_npy(path, a),
        };
        result.map_err(|e| PipelineError::Array(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct AiArtifact {
    pub image: DynamicImage,
    pub array: PixelArray,
}

pub fn preprocess(image: &DynamicImage, config: &AiConfig) -> Result<AiArtifact, PipelineError> {
    let (image, raw, channels) = match config.color_mode {
        ColorMode::Rgb => {
            let canvas = fit_and_pad(&image.to_rgb8(), config.size, Rgb([255, 255, 255]));
            let raw = canvas.as_raw().clone();
            (DynamicImage::ImageRgb8(canvas), raw, Some(3))
        }
        ColorMode::L => {
            let canvas = fit_and_pad(&to_luma_601(image), config.size, Luma([255]));
            let raw = canvas.as_raw().clone();
            (DynamicImage::ImageLuma8(canvas), raw, None)
        }
    };

    let (width, height) = config.size;
    let mut shape = vec![height as usize, width as usize];
    shape.extend(channels);
    let pixels = ArrayD::from_shape_vec(IxDyn(&shape), raw)
        .map_err(|e| PipelineError::Array(e.to_string()))?;

    let array = if config.normalize {
        PixelArray::F32(pixels.mapv(|v| v as f32 / 255.0))
    } else {
        PixelArray::U8(pixels)
    };
    Ok(AiArtifact { image, array })
}

/// Grayscale with ITU-R 601-2 weights (299/587/114 per mille), rounded.
///
/// `DynamicImage::to_luma8` uses Rec.709 weights, which render the red ECG grid darker.
pub fn to_luma_601(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
        Luma([((weighted + 500) / 1000) as u8])
    })
}

/// Largest size that fits in `target` with the source aspect ratio. Never upscales.
pub fn fit_within(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (w, h) = source;
    let (tw, th) = target;
    if w <= tw && h <= th {
        return (w, h);
    }
    let scale = (tw as f64 / w as f64).min(th as f64 / h as f64);
    let nw = ((w as f64 * scale).round() as u32).clamp(1, tw);
    let nh = ((h as f64 * scale).round() as u32).clamp(1, th);
    (nw, nh)
}

fn fit_and_pad<P>(
    source: &ImageBuffer<P, Vec<u8>>,
    target: (u32, u32),
    background: P,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (nw, nh) = fit_within(source.dimensions(), target);
    // Lanczos keeps the ECG trace sharp; uniform scaling keeps its morphology.
    let scaled = if (nw, nh) == source.dimensions() {
        source.clone()
    } else {
        imageops::resize(source, nw, nh, FilterType::Lanczos3)
    };

    let mut canvas = ImageBuffer::from_pixel(target.0, target.1, background);
    let offset_x = (target.0 - nw) / 2;
    let offset_y = (target.1 - nh) / 2;
    imageops::replace(&mut canvas, &scaled, offset_x as i64, offset_y as i64);
    canvas
}
