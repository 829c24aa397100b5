mod blit;
mod frame;
mod surface;
mod text;

pub use ab_glyph::FontVec;
pub use blit::blend_over;
pub use frame::SharedFrame;
pub use surface::SkiaSurface;
pub use text::{TextRaster, load_font, render_text_pixmap};
