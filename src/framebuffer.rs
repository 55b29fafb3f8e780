/// The screen width that we're emulating
pub const DISPLAY_WIDTH: usize = 64;
/// The screen height that we're emulating
pub const DISPLAY_HEIGHT: usize = 32;

/// Sprites are always one byte, so eight pixels, wide
const SPRITE_WIDTH: usize = 8;

/// The logical 64x32 monochrome screen.
///
/// Pixels are stored row-major, one byte per pixel holding either `0` or `1`.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    cells: [u8; DISPLAY_WIDTH * DISPLAY_HEIGHT],
}

impl Framebuffer {
    pub fn new() -> Self {
        Self {
            cells: [0; DISPLAY_WIDTH * DISPLAY_HEIGHT],
        }
    }

    /// Turns off every pixel
    pub fn clear(&mut self) {
        log::trace!("Clearing framebuffer");
        self.cells.fill(0);
    }

    /// All 2048 cells, row-major
    pub fn cells(&self) -> &[u8; DISPLAY_WIDTH * DISPLAY_HEIGHT] {
        &self.cells
    }

    /// Returns the pixel at `(x, y)`; coordinates wrap around the screen edges
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.cells[Self::index(x, y)]
    }

    /// Whether the pixel at `(x, y)` is lit
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.pixel(x, y) == 1
    }

    /// XORs a sprite into the framebuffer with its top-left corner at `(x, y)`.
    ///
    /// Each byte of `sprite` is one row, most significant bit leftmost. The origin is
    /// reduced modulo the screen size and every pixel past an edge wraps to the
    /// opposite side.
    ///
    /// Returns `true` if any lit pixel was turned off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let origin_x = x % DISPLAY_WIDTH;
        let origin_y = y % DISPLAY_HEIGHT;
        let mut collision = false;

        for (row_index, row) in sprite.iter().enumerate() {
            for bit in 0..SPRITE_WIDTH {
                if row & (0x80 >> bit) == 0 {
                    continue;
                }

                let index = Self::index(origin_x + bit, origin_y + row_index);
                collision |= self.cells[index] == 1;
                self.cells[index] ^= 1;
            }
        }

        collision
    }

    fn index(x: usize, y: usize) -> usize {
        (y % DISPLAY_HEIGHT) * DISPLAY_WIDTH + (x % DISPLAY_WIDTH)
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framebuffer {
    /// Renders the grid as text, `#` for lit pixels
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.chunks(DISPLAY_WIDTH) {
            let line: String = row
                .iter()
                .map(|&cell| if cell == 1 { '#' } else { '.' })
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Framebuffer {
    type Item = &'a u8;
    type IntoIter = std::slice::Iter<'a, u8>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
