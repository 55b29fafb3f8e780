use crate::error::{MachineError, Result};

/// The size of the CHIP-8 RAM
pub const MEMORY_SIZE: usize = 4096;

/// Address programs are loaded at, and where the program counter starts
pub const PROGRAM_START: u16 = 0x200;

/// Written directly after every loaded program. `0x0EFD` decodes to no
/// instruction, so running off the end of a ROM shows up as a decode fault
/// at a predictable address.
pub const HALT_SENTINEL: [u8; 2] = [0x0E, 0xFD];

/// Number of bytes in a single font glyph
pub const GLYPH_SIZE: u16 = 5;

/// Font for characters `0x0`-`0xF`
const FONT_BYTES: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Represents the CHIP-8's memory.
///
/// Every access is bounds checked; an address past the end of RAM is reported as
/// [`MachineError::AddressOutOfBounds`] rather than wrapped.
#[derive(Debug, Clone)]
pub struct Memory {
    memory: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Constructs a new [`Memory`] with the font loaded at address 0
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[..FONT_BYTES.len()].copy_from_slice(&FONT_BYTES);

        Self { memory }
    }

    /// Largest ROM that still leaves room for the halt sentinel
    pub const fn max_program_size() -> usize {
        MEMORY_SIZE - PROGRAM_START as usize - HALT_SENTINEL.len()
    }

    /// Copies `program` to [`PROGRAM_START`] and appends [`HALT_SENTINEL`]
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > Self::max_program_size() {
            return Err(MachineError::ProgramTooLarge {
                size: program.len(),
                max: Self::max_program_size(),
            });
        }

        let start = PROGRAM_START as usize;
        let end = start + program.len();
        self.memory[start..end].copy_from_slice(program);
        self.memory[end..end + HALT_SENTINEL.len()].copy_from_slice(&HALT_SENTINEL);

        Ok(())
    }

    /// Reads the byte at `address`
    pub fn read(&self, address: usize) -> Result<u8> {
        self.memory
            .get(address)
            .copied()
            .ok_or(MachineError::AddressOutOfBounds { address })
    }

    /// Reads the big-endian word stored at `address` and `address + 1`
    pub fn read_word(&self, address: usize) -> Result<u16> {
        let high = self.read(address)? as u16;
        let low = self.read(address + 1)? as u16;

        Ok((high << 8) | low)
    }

    /// Borrows `len` bytes starting at `start`
    pub fn slice(&self, start: usize, len: usize) -> Result<&[u8]> {
        self.memory
            .get(start..start + len)
            .ok_or(MachineError::AddressOutOfBounds {
                address: (start + len).saturating_sub(1).max(start),
            })
    }

    /// Mutably borrows `len` bytes starting at `start`
    pub fn slice_mut(&mut self, start: usize, len: usize) -> Result<&mut [u8]> {
        self.memory
            .get_mut(start..start + len)
            .ok_or(MachineError::AddressOutOfBounds {
                address: (start + len).saturating_sub(1).max(start),
            })
    }

    /// The whole address space, for diagnostic dumps
    pub fn as_bytes(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
