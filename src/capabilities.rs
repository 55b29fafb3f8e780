//! The services a [`Machine`](crate::Machine) borrows from its host.
//!
//! The machine never talks to a window, a sound card or an OS random source directly;
//! each of those is a trait implemented by the host. The stock implementations here
//! cover what needs no platform code.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::framebuffer::{DISPLAY_WIDTH, Framebuffer};
use crate::keypad::KEY_COUNT;
use crate::memory::MEMORY_SIZE;

/// Presents the framebuffer
pub trait Renderer {
    /// Allocate or clear the display surface. Called on every reset.
    fn initialize(&mut self);

    /// Present the whole 64x32 grid. Only called on cycles that changed it.
    fn draw(&mut self, framebuffer: &Framebuffer);
}

/// Reports which keys are currently held
pub trait InputSource {
    /// Fill `keys` with the current pressed state, one entry per key `0x0..=0xF`
    fn poll(&self, keys: &mut [bool; KEY_COUNT]);
}

/// Plays the buzzer. Fire-and-forget, no duration contract.
pub trait Beeper {
    fn beep(&mut self);
}

/// Source of uniformly distributed bytes for `CXNN`
pub trait RandomSource {
    fn next_byte(&mut self) -> u8;
}

/// Optional diagnostic sink.
///
/// Only [`Diagnostics::log`] is required. The dump hooks panic unless overridden, so a
/// sink that does not support them fails loudly when they are actually used.
pub trait Diagnostics {
    fn log(&mut self, message: &str);

    fn dump_memory(&mut self, _memory: &[u8; MEMORY_SIZE]) {
        unimplemented!("memory dumps are not supported by this diagnostics sink")
    }

    fn dump_framebuffer(&mut self, _framebuffer: &Framebuffer) {
        unimplemented!("framebuffer dumps are not supported by this diagnostics sink")
    }

    fn dump_registers(&mut self, _registers: &[u8; 16]) {
        unimplemented!("register dumps are not supported by this diagnostics sink")
    }
}

/// A missing beeper is silent
impl<B: Beeper> Beeper for Option<B> {
    fn beep(&mut self) {
        match self {
            Some(beeper) => beeper.beep(),
            None => log::debug!("Beep (no audio output)"),
        }
    }
}

impl<G: RandomSource + ?Sized> RandomSource for Box<G> {
    fn next_byte(&mut self) -> u8 {
        (**self).next_byte()
    }
}

/// Random bytes from the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_byte(&mut self) -> u8 {
        rand::rng().random()
    }
}

/// Reproducible random bytes from a fixed seed
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_byte(&mut self) -> u8 {
        self.rng.random()
    }
}

/// Forwards diagnostics to the `log` facade, dumps included
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn log(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn dump_memory(&mut self, memory: &[u8; MEMORY_SIZE]) {
        for (row, chunk) in memory.chunks(32).enumerate() {
            if chunk.iter().all(|&byte| byte == 0) {
                continue;
            }
            let bytes: Vec<String> = chunk.iter().map(|byte| format!("{byte:02x}")).collect();
            log::debug!("{:03x}: {}", row * 32, bytes.join(" "));
        }
    }

    fn dump_framebuffer(&mut self, framebuffer: &Framebuffer) {
        for (y, row) in framebuffer.cells().chunks(DISPLAY_WIDTH).enumerate() {
            let line: String = row
                .iter()
                .map(|&cell| if cell == 1 { '#' } else { '.' })
                .collect();
            log::debug!("{y:2} {line}");
        }
    }

    fn dump_registers(&mut self, registers: &[u8; 16]) {
        let values: Vec<String> = registers
            .iter()
            .enumerate()
            .map(|(index, value)| format!("V{index:X}={value:02x}"))
            .collect();
        log::debug!("{}", values.join(" "));
    }
}
