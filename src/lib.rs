//! A CHIP-8 virtual machine.
//!
//! [`Machine`] interprets the original CHIP-8 instruction set. It has no clock of its
//! own: the host calls [`Machine::step`] at a steady rate, reports keys with
//! [`Machine::apply_input`], and supplies the [`capabilities`] the machine draws,
//! beeps and generates random numbers with.

pub mod capabilities;
pub mod config;
pub mod error;
pub mod framebuffer;
pub mod instruction;
pub mod keypad;
pub mod machine;
pub mod memory;
pub mod stack;

#[cfg(test)]
mod testing;

pub use capabilities::{
    Beeper, Diagnostics, InputSource, LogDiagnostics, RandomSource, Renderer, SeededRandom,
    ThreadRandom,
};
pub use config::MachineConfig;
pub use error::MachineError;
pub use framebuffer::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Framebuffer};
pub use instruction::{Instruction, Opcode};
pub use keypad::Keypad;
pub use machine::{Cycle, Machine};
