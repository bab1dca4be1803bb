use std::path::Path;

use tiny_skia::Pixmap;

use crate::{Result, SoundPainterError};

/// Extent of the area a painter draws into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintSize {
    pub width: f32,
    pub height: f32,
}

/// Raster the consumer paints into.
#[derive(Clone)]
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(SoundPainterError::InvalidInput(
            "surface must have a non-zero size",
        ))?;
        Ok(Self { pixmap })
    }

    pub fn size(&self) -> PaintSize {
        PaintSize {
            width: self.pixmap.width() as f32,
            height: self.pixmap.height() as f32,
        }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.pixmap.pixel(x, y).map(|pixel| pixel.alpha())
    }

    /// Writes the current raster as a PNG image.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.pixmap
            .save_png(path)
            .map_err(|err| SoundPainterError::msg(format!("failed to save frame: {err}")))
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .finish()
    }
}
