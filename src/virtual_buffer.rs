use std::fmt::Debug;

use chip8_vm::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Framebuffer, Renderer};

/// The RGBA value of a pixel being on
const PIXEL_ON: u32 = 0xFFFFFFFF;
/// The RGBA value of a pixel being off
const PIXEL_OFF: u32 = 0x1A1A1AFF;

/// Host-side copy of the CHIP-8 screen, upscaled for the window
///
/// The machine hands over its 64x32 framebuffer whenever it changes; every virtual pixel
/// becomes a `scale_factor * scale_factor` block here, ready to be copied into the
/// `pixels` frame.
pub struct VirtualDisplay {
    /// The internal boolean pixel buffer. Stored as a 1D array
    buffer: Vec<bool>,
    /// The scaled up width in pixels of the display buffer
    scaled_width: usize,
    /// The scaled up height in pixels of the display buffer
    scaled_height: usize,
    /// The scaling factor used to convert virtual pixels to real pixels
    scale_factor: usize,
    /// Set when the buffer changed since the last [`Self::render_to_buffer`]
    dirty: bool,
}

impl VirtualDisplay {
    /// Construct a new [`VirtualDisplay`] with a given scale factor.
    ///
    /// # Example
    /// ```ignore
    /// let display = VirtualDisplay::new(10);
    /// // given a 64x32 virtual size
    /// assert_eq!(display.scaled_width(), 640);
    /// ```
    pub fn new(scale_factor: usize) -> Self {
        let scale_factor = scale_factor.max(1);
        Self {
            buffer: vec![false; (DISPLAY_WIDTH * scale_factor) * (DISPLAY_HEIGHT * scale_factor)],
            scaled_width: DISPLAY_WIDTH * scale_factor,
            scaled_height: DISPLAY_HEIGHT * scale_factor,
            scale_factor,
            dirty: true,
        }
    }

    /// Returns the scaled width in pixels
    pub const fn scaled_width(&self) -> usize {
        self.scaled_width
    }

    /// Returns the scaled height in pixels
    pub const fn scaled_height(&self) -> usize {
        self.scaled_height
    }

    /// Whether a redraw is needed
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Renders the internal buffer into a given RGBA byte frame and clears the dirty flag.
    ///
    /// # Panics
    ///
    /// If the provided frame is not large enough to hold the display data
    pub fn render_to_buffer(&mut self, frame: &mut [u8]) {
        for (index, pixel_on) in self.buffer.iter().enumerate() {
            let rgba = if *pixel_on { PIXEL_ON } else { PIXEL_OFF };

            let start = index * 4;
            frame[start..start + 4].copy_from_slice(&rgba.to_be_bytes());
        }
        self.dirty = false;
    }

    /// Returns the state of the real (scaled) pixel at the given coordinates
    #[cfg(test)]
    fn get_scaled_pixel(&self, x: usize, y: usize) -> bool {
        self.buffer[y * self.scaled_width + x]
    }
}

impl Renderer for VirtualDisplay {
    fn initialize(&mut self) {
        log::trace!("Initializing display");
        self.buffer.fill(false);
        self.dirty = true;
    }

    fn draw(&mut self, framebuffer: &Framebuffer) {
        for (scaled_y, row) in self.buffer.chunks_mut(self.scaled_width).enumerate() {
            let y = scaled_y / self.scale_factor;
            for (scaled_x, pixel) in row.iter_mut().enumerate() {
                *pixel = framebuffer.is_set(scaled_x / self.scale_factor, y);
            }
        }
        self.dirty = true;
    }
}

impl Debug for VirtualDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDisplay")
            .field("scaled_width", &self.scaled_width)
            .field("scaled_height", &self.scaled_height)
            .field("scale_factor", &self.scale_factor)
            .field("dirty", &self.dirty)
            .finish()
    }
}
