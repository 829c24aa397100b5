use std::sync::{Arc, Mutex};

use meanest_core::{ExperimentError, Result};
use tiny_skia::{Color, Pixmap};

/// The most recently presented frame, shared with the window thread.
#[derive(Debug, Clone)]
pub struct SharedFrame {
    inner: Arc<Mutex<Pixmap>>,
}

impl SharedFrame {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            ExperimentError::Render(format!("invalid frame size {width}x{height}"))
        })?;
        pixmap.fill(Color::BLACK);
        Ok(Self {
            inner: Arc::new(Mutex::new(pixmap)),
        })
    }

    pub(crate) fn replace_from(&self, canvas: &Pixmap) -> Result<()> {
        let mut front = self
            .inner
            .lock()
            .map_err(|_| ExperimentError::Render("frame lock poisoned".into()))?;
        if front.width() == canvas.width() && front.height() == canvas.height() {
            front.data_mut().copy_from_slice(canvas.data());
        } else {
            *front = canvas.clone();
        }
        Ok(())
    }

    /// Copies the frame into an RGBA8 buffer of the given size, top-left
    /// aligned and clipped. Returns false when the frame was unavailable.
    pub fn copy_to(&self, target: &mut [u8], width: u32, height: u32) -> bool {
        let Ok(front) = self.inner.lock() else {
            return false;
        };
        let cols = front.width().min(width) as usize * 4;
        let rows = front.height().min(height) as usize;
        let src_stride = front.width() as usize * 4;
        let dst_stride = width as usize * 4;
        let src = front.data();
        for row in 0..rows {
            let s = row * src_stride;
            let d = row * dst_stride;
            if d + cols > target.len() {
                break;
            }
            target[d..d + cols].copy_from_slice(&src[s..s + cols]);
        }
        true
    }
}
