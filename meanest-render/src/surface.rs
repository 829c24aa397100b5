use ab_glyph::FontVec;
use meanest_core::{ExperimentError, Result, Rgba, Surface};
use tiny_skia::{Color, FillRule, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};
use tracing::{debug, warn};

use crate::blit::blend_over;
use crate::frame::SharedFrame;
use crate::text::TextCache;

fn paint(color: Rgba) -> Paint<'static> {
    let [r, g, b, a] = color.0;
    let mut p = Paint::default();
    p.set_color(Color::from_rgba8(r, g, b, a));
    p.anti_alias = true;
    p
}

/// Software surface drawing into a back buffer; `present` publishes it to
/// the shared front frame.
pub struct SkiaSurface {
    width: u32,
    height: u32,
    canvas: Pixmap,
    front: SharedFrame,
    text_cache: TextCache,
    presented: u64,
}

impl SkiaSurface {
    pub fn new(width: u32, height: u32, font: Option<FontVec>) -> Result<Self> {
        let mut canvas = Pixmap::new(width, height).ok_or_else(|| {
            ExperimentError::Render(format!("invalid surface size {width}x{height}"))
        })?;
        canvas.fill(Color::BLACK);
        if font.is_none() {
            warn!("no font loaded, text will not be drawn");
        }
        Ok(Self {
            width,
            height,
            canvas,
            front: SharedFrame::new(width, height)?,
            text_cache: TextCache::new(font),
            presented: 0,
        })
    }

    /// Handle for the thread that puts frames on screen.
    pub fn shared_frame(&self) -> SharedFrame {
        self.front.clone()
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn frames_presented(&self) -> u64 {
        self.presented
    }
}

impl Surface for SkiaSurface {
    fn size(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    fn clear(&mut self) {
        self.canvas.fill(Color::BLACK);
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba) {
        let Some(path) = PathBuilder::from_circle(center.0, center.1, radius) else {
            return;
        };
        self.canvas.fill_path(
            &path,
            &paint(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn stroke_line(
        &mut self,
        center: (f32, f32),
        half_length: f32,
        angle_rad: f32,
        width: f32,
        color: Rgba,
    ) {
        let (dx, dy) = (half_length * angle_rad.cos(), half_length * angle_rad.sin());
        let mut pb = PathBuilder::new();
        pb.move_to(center.0 - dx, center.1 - dy);
        pb.line_to(center.0 + dx, center.1 + dy);
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width,
            line_cap: LineCap::Butt,
            ..Stroke::default()
        };
        self.canvas
            .stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
    }

    fn text(&mut self, text: &str, origin: (f32, f32), size_px: f32, color: Rgba) {
        if let Some(raster) = self.text_cache.get_or_render(text, size_px, color) {
            let x = (origin.0 + raster.offset.0).round() as i32;
            let y = (origin.1 + raster.offset.1).round() as i32;
            blend_over(&mut self.canvas, &raster.pixmap, x, y);
        }
    }

    fn present(&mut self) -> Result<()> {
        self.front.replace_from(&self.canvas)?;
        self.presented += 1;
        debug!(frame = self.presented, "presented");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tests::system_font;

    fn pixel(s: &SkiaSurface, x: u32, y: u32) -> [u8; 4] {
        let p = s.canvas().pixel(x, y).unwrap();
        [p.red(), p.green(), p.blue(), p.alpha()]
    }

    #[test]
    fn circle_is_filled_at_center() {
        let mut s = SkiaSurface::new(200, 100, None).unwrap();
        s.fill_circle((100.0, 50.0), 12.5, Rgba::BLUE);
        assert_eq!(pixel(&s, 100, 50), [0, 0, 255, 255]);
        assert_eq!(pixel(&s, 100, 70), [0, 0, 0, 255]);
        s.clear();
        assert_eq!(pixel(&s, 100, 50), [0, 0, 0, 255]);
    }

    #[test]
    fn positive_angle_rotates_clockwise_on_screen() {
        let mut s = SkiaSurface::new(300, 300, None).unwrap();
        let quarter = std::f32::consts::FRAC_PI_4;
        s.stroke_line((150.0, 150.0), 120.0, quarter, 4.0, Rgba::YELLOW);
        // clockwise in y-down coordinates puts the right end below center
        assert_eq!(pixel(&s, 220, 220), [255, 255, 0, 255]);
        assert_eq!(pixel(&s, 220, 80), [0, 0, 0, 255]);
    }

    #[test]
    fn nothing_is_shared_until_present() {
        let mut s = SkiaSurface::new(10, 10, None).unwrap();
        let front = s.shared_frame();
        s.fill_circle((5.0, 5.0), 4.0, Rgba::RED);

        let mut out = vec![0u8; 10 * 10 * 4];
        front.copy_to(&mut out, 10, 10);
        let mid = (5 * 10 + 5) * 4;
        assert_eq!(&out[mid..mid + 4], &[0, 0, 0, 255]);

        s.present().unwrap();
        front.copy_to(&mut out, 10, 10);
        assert_eq!(&out[mid..mid + 4], &[255, 0, 0, 255]);
        assert_eq!(s.frames_presented(), 1);
    }

    #[test]
    fn text_without_font_is_skipped() {
        let mut s = SkiaSurface::new(64, 64, None).unwrap();
        let before = s.canvas().data().to_vec();
        s.text("label", (4.0, 40.0), 20.0, Rgba::WHITE);
        assert_eq!(s.canvas().data(), &before[..]);
    }

    #[test]
    fn text_with_font_marks_pixels() {
        let Some(font) = system_font() else {
            return;
        };
        let mut s = SkiaSurface::new(200, 60, Some(font)).unwrap();
        s.text("Category 0", (24.0, 40.0), 20.0, Rgba::WHITE);
        let lit = s
            .canvas()
            .pixels()
            .iter()
            .filter(|p| p.red() > 128)
            .count();
        assert!(lit > 20);
        assert!((0..200).all(|x| s.canvas().pixel(x, 59).unwrap().red() == 0));
    }
}
