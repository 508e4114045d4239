use std::io::Cursor;

use anyhow::Context as _;

use crate::foundation::error::{CollabError, CollabResult};

/// Refuse to rasterize logos larger than this on either axis.
const MAX_DIM: u32 = 16_384;

/// Intrinsic size of a logo image in pixels (SVG user units for vector logos).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NaturalSize {
    pub width: f64,
    pub height: f64,
}

impl NaturalSize {
    pub fn aspect_ratio(self) -> f64 {
        self.width / self.height
    }
}

/// Which decoder a byte buffer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoFormat {
    Raster(image::ImageFormat),
    Svg,
}

pub fn sniff_format(bytes: &[u8]) -> Option<LogoFormat> {
    if let Ok(fmt) = image::guess_format(bytes) {
        return Some(LogoFormat::Raster(fmt));
    }
    if looks_like_svg(bytes) {
        return Some(LogoFormat::Svg);
    }
    None
}

/// Editors may emit long prologs, doctypes or comments ahead of the root element, so the whole
/// buffer is scanned.
fn looks_like_svg(bytes: &[u8]) -> bool {
    bytes.windows(4).any(|w| w == b"<svg")
}

/// Read the natural size without decoding pixels where the format allows it.
pub fn natural_size(bytes: &[u8]) -> CollabResult<NaturalSize> {
    let size = match sniff_format(bytes) {
        Some(LogoFormat::Raster(fmt)) => {
            let (w, h) = image::ImageReader::with_format(Cursor::new(bytes), fmt)
                .into_dimensions()
                .context("read image dimensions")?;
            NaturalSize {
                width: f64::from(w),
                height: f64::from(h),
            }
        }
        Some(LogoFormat::Svg) => {
            let tree = parse_svg(bytes)?;
            let s = tree.size();
            NaturalSize {
                width: f64::from(s.width()),
                height: f64::from(s.height()),
            }
        }
        None => return Err(CollabError::validation("unrecognized image format")),
    };

    if !(size.width.is_finite() && size.height.is_finite())
        || size.width <= 0.0
        || size.height <= 0.0
    {
        return Err(CollabError::validation(format!(
            "image has degenerate size {}x{}",
            size.width, size.height
        )));
    }
    Ok(size)
}

pub fn parse_svg(bytes: &[u8]) -> CollabResult<usvg::Tree> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    Ok(tree)
}

/// Decode a logo into straight-alpha RGBA8, scaled to `target_height` pixels tall.
pub fn rasterize_at_height(bytes: &[u8], target_height: u32) -> CollabResult<image::RgbaImage> {
    if target_height == 0 || target_height > MAX_DIM {
        return Err(CollabError::validation(format!(
            "raster height must be in 1..={MAX_DIM}"
        )));
    }

    match sniff_format(bytes) {
        Some(LogoFormat::Raster(_)) => {
            let img = image::load_from_memory(bytes).context("decode image from memory")?;
            let (w, h) = (img.width(), img.height());
            if w == 0 || h == 0 {
                return Err(CollabError::validation("image has zero size"));
            }
            let out_w = scaled_width(f64::from(w), f64::from(h), target_height)?;
            Ok(img
                .resize_exact(out_w, target_height, image::imageops::FilterType::Triangle)
                .to_rgba8())
        }
        Some(LogoFormat::Svg) => {
            let tree = parse_svg(bytes)?;
            let s = tree.size();
            let out_w = scaled_width(f64::from(s.width()), f64::from(s.height()), target_height)?;
            rasterize_svg(&tree, out_w, target_height)
        }
        None => Err(CollabError::validation("unrecognized image format")),
    }
}

fn scaled_width(w: f64, h: f64, target_height: u32) -> CollabResult<u32> {
    let out = (f64::from(target_height) * w / h).round().max(1.0);
    if !out.is_finite() || out > f64::from(MAX_DIM) {
        return Err(CollabError::validation(format!(
            "scaled logo width out of range: {out}"
        )));
    }
    Ok(out as u32)
}

fn rasterize_svg(tree: &usvg::Tree, width: u32, height: u32) -> CollabResult<image::RgbaImage> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CollabError::validation("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
    resvg::render(tree, xform, &mut pixmap.as_mut());

    let mut rgba = pixmap.take();
    unpremultiply_rgba8_in_place(&mut rgba);
    image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| CollabError::validation("svg pixmap size mismatch"))
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}
