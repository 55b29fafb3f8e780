use crate::error::{MachineError, Result};

/// Number of nested subroutine calls the CHIP-8 supports
pub const STACK_DEPTH: usize = 16;

/// Return-address stack for `2NNN`/`00EE`
#[derive(Debug, Clone)]
pub struct Stack {
    memory: [u16; STACK_DEPTH],
    stack_pointer: u8,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            memory: [0; STACK_DEPTH],
            stack_pointer: 0,
        }
    }

    /// Pushes `value`. `caller` is only used to describe an overflow.
    pub fn push(&mut self, value: u16, caller: u16) -> Result<()> {
        let slot = self
            .memory
            .get_mut(self.stack_pointer as usize)
            .ok_or(MachineError::StackOverflow { address: caller })?;
        *slot = value;
        self.stack_pointer += 1;

        Ok(())
    }

    /// Pops the most recent value. `caller` is only used to describe an underflow.
    pub fn pop(&mut self, caller: u16) -> Result<u16> {
        if self.stack_pointer == 0 {
            return Err(MachineError::StackUnderflow { address: caller });
        }

        self.stack_pointer -= 1;
        Ok(self.memory[self.stack_pointer as usize])
    }

    /// Number of occupied levels
    pub fn pointer(&self) -> u8 {
        self.stack_pointer
    }

    pub fn entries(&self) -> &[u16] {
        &self.memory[..self.stack_pointer as usize]
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
