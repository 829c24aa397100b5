use bytemuck::{cast_slice, cast_slice_mut};
use tiny_skia::Pixmap;

/// Composites `src` over `dst` with its top-left at `(x, y)`, clipping to
/// `dst`. Both pixmaps are premultiplied RGBA.
pub fn blend_over(dst: &mut Pixmap, src: &Pixmap, x: i32, y: i32) {
    let (cw, ch) = (dst.width() as i32, dst.height() as i32);
    let (w, h) = (src.width() as i32, src.height() as i32);
    if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
        return;
    }

    let dst_x = x.max(0) as usize;
    let dst_y = y.max(0) as usize;
    let src_x = (-x).max(0) as usize;
    let src_y = (-y).max(0) as usize;
    let copy_w = (w as usize - src_x).min(cw as usize - dst_x);
    let copy_h = (h as usize - src_y).min(ch as usize - dst_y);
    let src_stride = src.width() as usize;
    let dst_stride = dst.width() as usize;

    let src_px: &[u32] = cast_slice(src.data());
    let dst_px: &mut [u32] = cast_slice_mut(dst.data_mut());

    for row in 0..copy_h {
        let s_row = (src_y + row) * src_stride + src_x;
        let d_row = (dst_y + row) * dst_stride + dst_x;
        for i in 0..copy_w {
            let s = src_px[s_row + i];
            let sa = s >> 24;
            if sa == 0 {
                continue;
            }
            if sa == 0xFF {
                dst_px[d_row + i] = s;
                continue;
            }
            let d = dst_px[d_row + i];
            let inv = 255 - sa;
            let over = |shift: u32| {
                let sc = (s >> shift) & 0xFF;
                let dc = (d >> shift) & 0xFF;
                (sc + (dc * inv + 127) / 255).min(255) << shift
            };
            dst_px[d_row + i] = over(0) | over(8) | over(16) | over(24);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    fn solid(w: u32, h: u32, c: Color) -> Pixmap {
        let mut p = Pixmap::new(w, h).unwrap();
        p.fill(c);
        p
    }

    #[test]
    fn opaque_source_replaces_clipped_region() {
        let mut dst = solid(4, 4, Color::BLACK);
        let src = solid(3, 3, Color::WHITE);
        blend_over(&mut dst, &src, 2, -1);
        let px = |x: u32, y: u32| dst.pixel(x, y).unwrap();
        assert_eq!(px(2, 0).red(), 255);
        assert_eq!(px(3, 1).red(), 255);
        assert_eq!(px(1, 0).red(), 0);
        assert_eq!(px(2, 2).red(), 0);
    }

    #[test]
    fn half_transparent_source_blends() {
        let mut dst = solid(1, 1, Color::BLACK);
        let src = solid(1, 1, Color::from_rgba8(255, 255, 255, 128));
        blend_over(&mut dst, &src, 0, 0);
        let p = dst.pixel(0, 0).unwrap();
        assert_eq!(p.alpha(), 255);
        assert!((127..=129).contains(&p.red()), "{}", p.red());
    }

    #[test]
    fn fully_outside_is_ignored() {
        let mut dst = solid(2, 2, Color::BLACK);
        let before = dst.data().to_vec();
        blend_over(&mut dst, &solid(2, 2, Color::WHITE), 5, 0);
        blend_over(&mut dst, &solid(2, 2, Color::WHITE), -2, 0);
        assert_eq!(dst.data(), &before[..]);
    }
}
