//! Monochrome display buffer.
use crate::constants::*;

/// 64x32 grid of 1-bit pixels, stored row by row.
///
/// Only the draw and clear instructions mutate it. Renderers read it
/// between cycles.
pub struct Framebuffer {
    pixels: Box<[bool; DISPLAY_BUFFER_SIZE]>,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
        }
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn width(&self) -> usize {
        DISPLAY_WIDTH
    }

    pub fn height(&self) -> usize {
        DISPLAY_HEIGHT
    }

    /// Pixel state at the given coordinate. Coordinates wrap around.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[index(x, y)]
    }

    /// Raw row-major buffer.
    pub fn as_slice(&self) -> &[bool; DISPLAY_BUFFER_SIZE] {
        &self.pixels
    }

    /// Iterate over the rows of the display, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(DISPLAY_WIDTH)
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// XOR a sprite onto the display at the given coordinate.
    ///
    /// Each byte of the sprite is one row of 8 pixels, most-significant bit first.
    /// If the sprite is drawn outside of the display area, it is wrapped around
    /// to the other side.
    ///
    /// Returns `true` if any pixel was erased, which is a collision.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: impl IntoIterator<Item = u8>) -> bool {
        let mut is_erased = false;

        for (r, row) in sprite.into_iter().enumerate() {
            for c in 0..SPRITE_WIDTH {
                if (row >> (7 - c)) & 1 == 0 {
                    continue;
                }

                let d = index(x + c, y + r);
                let old_px = self.pixels[d];

                // XOR erases a pixel when both the old and new values are both 1.
                is_erased |= old_px;
                self.pixels[d] = !old_px;
            }
        }

        is_erased
    }
}

#[inline(always)]
fn index(x: usize, y: usize) -> usize {
    (x & DISPLAY_WIDTH_MASK) + (y & DISPLAY_HEIGHT_MASK) * DISPLAY_WIDTH
}
