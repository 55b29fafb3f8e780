use thiserror::Error;

/// Fatal conditions raised while running a CHIP-8 program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MachineError {
    /// A call was made while all 16 stack levels were in use
    #[error("stack overflow: call at 0x{address:03x} with all 16 levels in use")]
    StackOverflow { address: u16 },

    /// A return was made with nothing on the stack
    #[error("stack underflow: return at 0x{address:03x} with an empty stack")]
    StackUnderflow { address: u16 },

    /// An address computed from I, PC or a jump fell outside of RAM
    #[error("memory access out of bounds at 0x{address:04x}")]
    AddressOutOfBounds { address: usize },

    /// The program (plus the trailing halt marker) does not fit in RAM
    #[error("program of {size} bytes does not fit, at most {max} bytes can be loaded")]
    ProgramTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, MachineError>;
