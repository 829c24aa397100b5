use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use meanest_core::Rgba;
use tiny_skia::{Pixmap, PremultipliedColorU8};

pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    FontVec::try_from_vec(bytes).map_err(|e| anyhow!("{}: {e}", path.display()))
}

/// A rasterized line of text and where its top-left sits relative to the
/// left end of the baseline.
#[derive(Debug, Clone)]
pub struct TextRaster {
    pub pixmap: Pixmap,
    pub offset: (f32, f32),
}

/// Rasterizes `text` into a tight, transparent, premultiplied pixmap.
/// `None` when nothing in the text has an outline.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Rgba,
) -> Option<TextRaster> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    if outlines.is_empty() {
        return None;
    }

    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();
    let [cr, cg, cb, ca] = color.0;

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a = (cov * ca as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a * 255.0) as u8;
            let inv = 1.0 - a;
            let bg = dst[i];
            let mix = |s: u8, d: u8| ((s as f32 * a) as u8).saturating_add((d as f32 * inv) as u8);
            let alpha = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
            let px = PremultipliedColorU8::from_rgba(
                mix(cr, bg.red()).min(alpha),
                mix(cg, bg.green()).min(alpha),
                mix(cb, bg.blue()).min(alpha),
                alpha,
            );
            if let Some(px) = px {
                dst[i] = px;
            }
        });
    }

    Some(TextRaster {
        pixmap: pm,
        offset: (min_x.floor(), min_y.floor() - sf.ascent()),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TextKey {
    text: String,
    size_bits: u32,
    color: [u8; 4],
}

/// Rasterized strings, keyed by content, size and color.
pub(crate) struct TextCache {
    font: Option<FontVec>,
    map: HashMap<TextKey, Arc<TextRaster>>,
}

impl TextCache {
    pub(crate) fn new(font: Option<FontVec>) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    pub(crate) fn get_or_render(
        &mut self,
        text: &str,
        size_px: f32,
        color: Rgba,
    ) -> Option<Arc<TextRaster>> {
        let font = self.font.as_ref()?;
        let key = TextKey {
            text: text.to_string(),
            size_bits: size_px.to_bits(),
            color: color.0,
        };
        if let Some(r) = self.map.get(&key) {
            return Some(Arc::clone(r));
        }
        let raster = Arc::new(render_text_pixmap(text, size_px, font, color)?);
        self.map.insert(key, Arc::clone(&raster));
        Some(raster)
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}
