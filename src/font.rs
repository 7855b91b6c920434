use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use tracing::debug;

/// Well-known TrueType locations, checked after any configured font.
const SYSTEM_FONTS: &[&str] = &[
    "arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const BITMAP_CELL: u32 = 8;

/// One way of obtaining a font; strategies are tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontStrategy {
    File(PathBuf),
    Builtin,
}

pub enum FontFace {
    TrueType(FontVec),
    /// 8x8 bitmap glyphs compiled into the binary, scaled by pixel replication.
    Bitmap,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontFace::TrueType(_) => f.write_str("FontFace::TrueType"),
            FontFace::Bitmap => f.write_str("FontFace::Bitmap"),
        }
    }
}

/// Configured font first, then system fonts, then the built-in bitmap font.
pub fn default_strategies(configured: Option<&Path>) -> Vec<FontStrategy> {
    configured
        .map(|p| FontStrategy::File(p.to_path_buf()))
        .into_iter()
        .chain(SYSTEM_FONTS.iter().map(|p| FontStrategy::File(PathBuf::from(*p))))
        .chain(std::iter::once(FontStrategy::Builtin))
        .collect()
}

/// First strategy that yields a usable font. Never fails.
pub fn resolve(strategies: &[FontStrategy]) -> FontFace {
    for strategy in strategies {
        match strategy {
            FontStrategy::File(path) => {
                if let Some(font) = load_file(path) {
                    debug!(font = %path.display(), "using TrueType font");
                    return FontFace::TrueType(font);
                }
            }
            FontStrategy::Builtin => break,
        }
    }
    debug!("using built-in bitmap font");
    FontFace::Bitmap
}

fn load_file(path: &Path) -> Option<FontVec> {
    let data = fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

impl FontFace {
    /// Draw one line with its top-left corner at `(x, y)`; pixels outside the canvas are clipped.
    pub fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, px: f32, text: &str) {
        match self {
            FontFace::TrueType(font) => draw_text_mut(canvas, color, x, y, px, font, text),
            FontFace::Bitmap => draw_bitmap(canvas, color, x, y, px, text),
        }
    }
}

fn glyph(c: char) -> Option<[u8; 8]> {
    let c = if c == '•' { '-' } else { c };
    BASIC_FONTS.get(c).or_else(|| LATIN_FONTS.get(c))
}

fn draw_bitmap(canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, px: f32, text: &str) {
    let scale = ((px / BITMAP_CELL as f32).round() as i32).max(1);
    let advance = BITMAP_CELL as i32 * scale;
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);

    for (index, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else { continue };
        let origin_x = x + index as i32 * advance;
        for (row, &bits) in rows.iter().enumerate() {
            for col in 0..BITMAP_CELL as i32 {
                // Bit 0 is the leftmost column.
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let cx = origin_x + col * scale + dx;
                        let cy = y + row as i32 * scale + dy;
                        if cx >= 0 && cy >= 0 && cx < width && cy < height {
                            canvas.put_pixel(cx as u32, cy as u32, color);
                        }
                    }
                }
            }
        }
    }
}
