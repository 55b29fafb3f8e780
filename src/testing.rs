//! Fake capabilities for unit tests

use std::cell::RefCell;
use std::rc::Rc;

use crate::capabilities::{Beeper, Diagnostics, InputSource, RandomSource, Renderer};
use crate::config::MachineConfig;
use crate::framebuffer::Framebuffer;
use crate::keypad::KEY_COUNT;
use crate::machine::Machine;

/// Remembers every frame it was asked to draw
#[derive(Debug, Default)]
pub struct FakeRenderer {
    pub initialized: u32,
    pub frames: Vec<Framebuffer>,
}

impl Renderer for FakeRenderer {
    fn initialize(&mut self) {
        self.initialized += 1;
    }

    fn draw(&mut self, framebuffer: &Framebuffer) {
        self.frames.push(framebuffer.clone());
    }
}

#[derive(Debug, Default)]
pub struct FakeBeeper {
    pub beeps: u32,
}

impl Beeper for FakeBeeper {
    fn beep(&mut self) {
        self.beeps += 1;
    }
}

/// Always yields the same byte
#[derive(Debug)]
pub struct FixedRandom(pub u8);

impl RandomSource for FixedRandom {
    fn next_byte(&mut self) -> u8 {
        self.0
    }
}

/// Reports a fixed set of held keys
#[derive(Debug, Default)]
pub struct HeldKeys(pub Vec<u8>);

impl InputSource for HeldKeys {
    fn poll(&self, keys: &mut [bool; KEY_COUNT]) {
        keys.fill(false);
        for &key in &self.0 {
            keys[key as usize] = true;
        }
    }
}

/// Collects logged messages into a shared buffer the test keeps a handle to
#[derive(Debug, Default, Clone)]
pub struct RecordingDiagnostics {
    pub messages: Rc<RefCell<Vec<String>>>,
}

impl Diagnostics for RecordingDiagnostics {
    fn log(&mut self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

pub type TestMachine = Machine<FakeRenderer, FakeBeeper, FixedRandom>;

/// A machine at the default rate with `program` loaded
pub fn machine_with(program: &[u8]) -> TestMachine {
    let mut machine = Machine::new(
        FakeRenderer::default(),
        FakeBeeper::default(),
        FixedRandom(0xFF),
        MachineConfig::default(),
    );
    machine
        .load_program(program)
        .expect("test program should fit in memory");
    machine
}
