use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    pub const BLUE: Rgba = Rgba([0, 0, 255, 255]);
    pub const RED: Rgba = Rgba([255, 0, 0, 255]);
    pub const YELLOW: Rgba = Rgba([255, 255, 0, 255]);
}

/// Minimal 2D drawing capability. Coordinates are pixels, y grows downward.
pub trait Surface {
    fn size(&self) -> (f32, f32);

    fn center(&self) -> (f32, f32) {
        let (w, h) = self.size();
        (w / 2.0, h / 2.0)
    }

    fn clear(&mut self);
    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba);
    /// Line of length `2 * half_length` through `center`, rotated clockwise
    /// by `angle_rad` from the horizontal.
    fn stroke_line(
        &mut self,
        center: (f32, f32),
        half_length: f32,
        angle_rad: f32,
        width: f32,
        color: Rgba,
    );
    /// `origin` is the left end of the text baseline.
    fn text(&mut self, text: &str, origin: (f32, f32), size_px: f32, color: Rgba);
    /// Makes everything drawn since the last present visible at once.
    fn present(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Rgba,
    },
    Line {
        center: (f32, f32),
        half_length: f32,
        angle_rad: f32,
        width: f32,
        color: Rgba,
    },
    Text {
        text: String,
        origin: (f32, f32),
        size_px: f32,
        color: Rgba,
    },
}

/// Keeps every presented frame as a list of draw commands.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: (f32, f32),
    pending: Vec<DrawCommand>,
    frames: Vec<Vec<DrawCommand>>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: (width, height),
            pending: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn frames(&self) -> &[Vec<DrawCommand>] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&[DrawCommand]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Text of every presented frame, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.frames
            .iter()
            .flatten()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        self.size
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.pending.push(DrawCommand::Clear);
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba) {
        self.pending.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn stroke_line(
        &mut self,
        center: (f32, f32),
        half_length: f32,
        angle_rad: f32,
        width: f32,
        color: Rgba,
    ) {
        self.pending.push(DrawCommand::Line {
            center,
            half_length,
            angle_rad,
            width,
            color,
        });
    }

    fn text(&mut self, text: &str, origin: (f32, f32), size_px: f32, color: Rgba) {
        self.pending.push(DrawCommand::Text {
            text: text.to_string(),
            origin,
            size_px,
            color,
        });
    }

    fn present(&mut self) -> Result<()> {
        self.frames.push(std::mem::take(&mut self.pending));
        Ok(())
    }
}
