use std::{collections::HashMap, sync::Arc};

use crate::{
    assets::{LogoFetcher, rasterize_at_height},
    bar::FrameLayout,
    foundation::error::{CollabError, CollabResult},
    resolve::ResolvedLogoEntry,
};

/// Decoded logo pixels keyed by source, all at the same height.
#[derive(Clone, Debug, Default)]
pub struct LogoBitmaps {
    height: u32,
    by_source: HashMap<String, Arc<image::RgbaImage>>,
}

impl LogoBitmaps {
    /// Fetch and rasterize every distinct source in `logos` at `height` pixels.
    ///
    /// Logos that fail here are skipped with a warning and simply not drawn.
    #[tracing::instrument(skip(fetcher, logos), fields(logos = logos.len()))]
    pub fn prepare(fetcher: &dyn LogoFetcher, logos: &[ResolvedLogoEntry], height: u32) -> Self {
        let mut by_source = HashMap::new();
        for logo in logos {
            if by_source.contains_key(logo.source()) {
                continue;
            }
            let res = fetcher
                .fetch(logo.source())
                .and_then(|bytes| rasterize_at_height(&bytes, height));
            match res {
                Ok(img) => {
                    by_source.insert(logo.source().to_owned(), Arc::new(img));
                }
                Err(error) => {
                    tracing::warn!(source = logo.source(), %error, "logo bitmap skipped");
                }
            }
        }
        Self { height, by_source }
    }

    pub fn insert(&mut self, source: impl Into<String>, img: image::RgbaImage) -> CollabResult<()> {
        if self.by_source.is_empty() && self.height == 0 {
            self.height = img.height();
        }
        if img.height() != self.height {
            return Err(CollabError::validation(format!(
                "bitmap height {} does not match {}",
                img.height(),
                self.height
            )));
        }
        self.by_source.insert(source.into(), Arc::new(img));
        Ok(())
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, source: &str) -> Option<&image::RgbaImage> {
        self.by_source.get(source).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

/// Composite one frame of the strip over `background`.
///
/// The frame is `ceil(layout.width) x ceil(layout.height)` straight-alpha RGBA8.
pub fn render_frame(
    layout: &FrameLayout<'_>,
    bitmaps: &LogoBitmaps,
    background: [u8; 4],
) -> CollabResult<image::RgbaImage> {
    let w = layout.width.ceil();
    let h = layout.height.ceil();
    if w < 1.0 || h < 1.0 || w > f64::from(u32::MAX) || h > f64::from(u32::MAX) {
        return Err(CollabError::validation(format!(
            "frame size out of range: {w}x{h}"
        )));
    }

    let mut canvas = image::RgbaImage::from_pixel(w as u32, h as u32, image::Rgba(background));
    for placed in &layout.logos {
        let Some(bmp) = bitmaps.get(placed.logo.source()) else {
            continue;
        };
        let x = placed.rect.x0.round() as i64;
        let y = placed.rect.y0.round() as i64;
        image::imageops::overlay(&mut canvas, bmp, x, y);
    }
    Ok(canvas)
}
