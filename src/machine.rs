use std::fmt;

use crate::capabilities::{Beeper, Diagnostics, InputSource, RandomSource, Renderer};
use crate::config::MachineConfig;
use crate::error::Result;
use crate::framebuffer::Framebuffer;
use crate::instruction::{Instruction, Opcode};
use crate::keypad::{KEY_COUNT, Keypad};
use crate::memory::{GLYPH_SIZE, Memory, PROGRAM_START};
use crate::stack::Stack;

/// Index of the flag register VF
const FLAG: usize = 0xF;

/// What a single call to [`Machine::step`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// An instruction was fetched and executed
    Executed(Instruction),
    /// The machine is blocked on `FX0A`; nothing was fetched
    AwaitingKey,
    /// The word at PC is not an instruction. It was skipped like a 2-byte no-op.
    DecodeFault(u16),
}

/// How the program counter moves after an instruction
enum Flow {
    Next,
    Skip,
    Jump(u16),
}

impl Flow {
    fn skip_if(condition: bool) -> Self {
        if condition { Flow::Skip } else { Flow::Next }
    }
}

/// The CHIP-8 virtual machine.
///
/// Owns every piece of guest state and the host capabilities it draws, beeps and
/// rolls dice with. The host drives it by calling [`Machine::step`] at
/// [`MachineConfig::instruction_rate`] and feeding keys in with
/// [`Machine::apply_input`] or [`Machine::poll_input`].
pub struct Machine<R, B, G> {
    config: MachineConfig,
    memory: Memory,
    v_registers: [u8; 16],
    index_register: u16,
    program_counter: u16,
    stack: Stack,
    delay_timer: u8,
    sound_timer: u8,
    /// Steps left until the next 60Hz timer tick
    timer_divider: u32,
    framebuffer: Framebuffer,
    keys: Keypad,
    /// Target register of a pending `FX0A`
    key_wait_register: Option<u8>,
    renderer: R,
    beeper: B,
    random: G,
    diagnostics: Option<Box<dyn Diagnostics>>,
}

impl<R, B, G> Machine<R, B, G>
where
    R: Renderer,
    B: Beeper,
    G: RandomSource,
{
    /// Builds a machine in its reset state
    pub fn new(renderer: R, beeper: B, random: G, config: MachineConfig) -> Self {
        let mut machine = Self {
            config,
            memory: Memory::new(),
            v_registers: [0; 16],
            index_register: 0,
            program_counter: PROGRAM_START,
            stack: Stack::new(),
            delay_timer: 0,
            sound_timer: 0,
            timer_divider: config.steps_per_timer_tick(),
            framebuffer: Framebuffer::new(),
            keys: Keypad::empty(),
            key_wait_register: None,
            renderer,
            beeper,
            random,
            diagnostics: None,
        };
        machine.reset();
        machine
    }

    /// Attaches a diagnostics sink
    pub fn with_diagnostics(mut self, diagnostics: Box<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Returns every register, timer, buffer and latch to its power-on state and
    /// re-initializes the renderer. The loaded program is erased.
    pub fn reset(&mut self) {
        self.memory = Memory::new();
        self.v_registers = [0; 16];
        self.index_register = 0;
        self.program_counter = PROGRAM_START;
        self.stack = Stack::new();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.timer_divider = self.config.steps_per_timer_tick();
        self.framebuffer.clear();
        self.keys = Keypad::empty();
        self.key_wait_register = None;
        self.renderer.initialize();

        log::info!("Machine reset");
        self.diagnose("Machine reset");
    }

    /// Copies a raw ROM to 0x200, followed by the halt sentinel. Nothing but memory
    /// is touched.
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        self.memory.load_program(program)?;

        log::info!("Loaded program of {} bytes", program.len());
        self.diagnose(&format!("ROM loaded - {} bytes", program.len()));
        Ok(())
    }

    /// Runs one cycle: fetch, decode and execute a single instruction (unless blocked on
    /// `FX0A`), then advance the timer divider.
    ///
    /// Stack and memory violations are returned as errors and leave the program counter
    /// on the offending instruction.
    pub fn step(&mut self) -> Result<Cycle> {
        let cycle = match self.key_wait_register {
            Some(_) => Cycle::AwaitingKey,
            None => self.run_instruction()?,
        };

        self.timer_divider -= 1;
        if self.timer_divider == 0 {
            self.timer_divider = self.config.steps_per_timer_tick();
            self.tick_timers();
        }

        Ok(cycle)
    }

    /// One 60Hz tick: counts both timers down towards zero and beeps when the sound
    /// timer runs out
    pub fn tick_timers(&mut self) {
        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }

        if self.sound_timer > 0 {
            if self.sound_timer == 1 {
                log::debug!("Sound timer expired, beeping");
                self.beeper.beep();
            }
            self.sound_timer -= 1;
        }
    }

    /// Replaces the keypad state. If the machine is waiting on `FX0A` and any key is
    /// down, the lowest pressed key is stored and execution resumes on the next step.
    pub fn apply_input(&mut self, keys: Keypad) {
        if keys != self.keys {
            log::debug!("Keypad: {:016b}", keys.bits());
        }
        self.keys = keys;

        if let Some(reg_x) = self.key_wait_register
            && let Some(key) = keys.lowest_pressed()
        {
            log::debug!("Writing key {:X} to register V{:X}", key, reg_x);
            self.v_registers[reg_x as usize] = key;
            self.key_wait_register = None;
        }
    }

    /// Reads the current keys from `source` and applies them
    pub fn poll_input<I: InputSource + ?Sized>(&mut self, source: &I) {
        let mut states = [false; KEY_COUNT];
        source.poll(&mut states);
        self.apply_input(Keypad::from_states(&states));
    }

    /// Sends registers, memory and framebuffer to the diagnostics sink, if any
    pub fn dump_state(&mut self) {
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.dump_registers(&self.v_registers);
            diagnostics.dump_memory(self.memory.as_bytes());
            diagnostics.dump_framebuffer(&self.framebuffer);
        }
    }

    fn diagnose(&mut self, message: &str) {
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.log(message);
        }
    }

    fn run_instruction(&mut self) -> Result<Cycle> {
        let address = self.program_counter;
        let word = self.memory.read_word(address as usize)?;

        let Some(instruction) = Instruction::decode(Opcode::decode(word)) else {
            log::warn!("Invalid opcode 0x{:04x} at 0x{:03x}", word, address);
            self.diagnose(&format!("Invalid opcode = 0x{word:04X}"));
            // unknown words are stepped over like a 2-byte no-op
            self.program_counter = address + 2;
            return Ok(Cycle::DecodeFault(word));
        };

        log::trace!("0x{:03x}: {:04x} {}", address, word, instruction);

        match self.execute(instruction)? {
            Flow::Next => self.program_counter = address + 2,
            Flow::Skip => self.program_counter = address + 4,
            Flow::Jump(target) => self.program_counter = target,
        }

        if instruction.draws() {
            self.renderer.draw(&self.framebuffer);
        }

        Ok(Cycle::Executed(instruction))
    }

    fn execute(&mut self, instruction: Instruction) -> Result<Flow> {
        use Instruction::*;

        let pc = self.program_counter;
        let v = &mut self.v_registers;

        let flow = match instruction {
            ClearScreen => {
                self.framebuffer.clear();
                Flow::Next
            }
            Return => {
                let caller = self.stack.pop(pc)?;
                Flow::Jump(caller + 2)
            }
            Jump(target) => Flow::Jump(target),
            Call(target) => {
                self.stack.push(pc, pc)?;
                Flow::Jump(target)
            }
            SkipIfEqualByte { x, byte } => Flow::skip_if(v[x as usize] == byte),
            SkipIfNotEqualByte { x, byte } => Flow::skip_if(v[x as usize] != byte),
            SkipIfEqual { x, y } => Flow::skip_if(v[x as usize] == v[y as usize]),
            LoadByte { x, byte } => {
                v[x as usize] = byte;
                Flow::Next
            }
            AddByte { x, byte } => {
                v[x as usize] = v[x as usize].wrapping_add(byte);
                Flow::Next
            }
            Copy { x, y } => {
                v[x as usize] = v[y as usize];
                Flow::Next
            }
            Or { x, y } => {
                v[x as usize] |= v[y as usize];
                Flow::Next
            }
            And { x, y } => {
                v[x as usize] &= v[y as usize];
                Flow::Next
            }
            Xor { x, y } => {
                v[x as usize] ^= v[y as usize];
                Flow::Next
            }
            Add { x, y } => {
                let (sum, carry) = v[x as usize].overflowing_add(v[y as usize]);
                v[x as usize] = sum;
                v[FLAG] = carry.into();
                Flow::Next
            }
            Sub { x, y } => {
                let (difference, borrow) = v[x as usize].overflowing_sub(v[y as usize]);
                v[x as usize] = difference;
                v[FLAG] = (!borrow).into();
                Flow::Next
            }
            ShiftRight { x } => {
                // the bit shifted out lands in VF
                let vx = v[x as usize];
                v[x as usize] = vx >> 1;
                v[FLAG] = vx & 1;
                Flow::Next
            }
            SubReverse { x, y } => {
                let (difference, borrow) = v[y as usize].overflowing_sub(v[x as usize]);
                v[x as usize] = difference;
                v[FLAG] = (!borrow).into();
                Flow::Next
            }
            ShiftLeft { x } => {
                let vx = v[x as usize];
                v[x as usize] = vx << 1;
                v[FLAG] = vx >> 7;
                Flow::Next
            }
            SkipIfNotEqual { x, y } => Flow::skip_if(v[x as usize] != v[y as usize]),
            LoadIndex(address) => {
                self.index_register = address;
                Flow::Next
            }
            JumpOffset(address) => Flow::Jump(v[0] as u16 + address),
            Random { x, mask } => {
                v[x as usize] = self.random.next_byte() & mask;
                Flow::Next
            }
            Draw { x, y, rows } => {
                // a zero-row draw reads nothing, so I may point anywhere
                let sprite: &[u8] = match rows {
                    0 => &[],
                    _ => self.memory.slice(self.index_register as usize, rows as usize)?,
                };
                let (col, row) = (v[x as usize] as usize, v[y as usize] as usize);
                let collision = self.framebuffer.draw_sprite(col, row, sprite);
                v[FLAG] = collision.into();
                Flow::Next
            }
            SkipIfKeyPressed { x } => Flow::skip_if(self.keys.is_pressed(v[x as usize])),
            SkipIfKeyNotPressed { x } => Flow::skip_if(!self.keys.is_pressed(v[x as usize])),
            LoadDelay { x } => {
                v[x as usize] = self.delay_timer;
                Flow::Next
            }
            WaitForKey { x } => {
                log::debug!("Waiting for a key press into V{:X}", x);
                self.key_wait_register = Some(x);
                Flow::Next
            }
            SetDelay { x } => {
                self.delay_timer = v[x as usize];
                Flow::Next
            }
            SetSound { x } => {
                self.sound_timer = v[x as usize];
                Flow::Next
            }
            AddIndex { x } => {
                self.index_register = self.index_register.wrapping_add(v[x as usize] as u16);
                Flow::Next
            }
            LoadGlyph { x } => {
                let vx = v[x as usize];
                if vx > 0xF {
                    log::warn!("FX29 with V{:X}=0x{:02x}, which has no font glyph", x, vx);
                }
                self.index_register = vx as u16 * GLYPH_SIZE;
                Flow::Next
            }
            StoreBcd { x } => {
                let vx = v[x as usize];
                let digits = [vx / 100, (vx / 10) % 10, vx % 10];
                self.memory
                    .slice_mut(self.index_register as usize, digits.len())?
                    .copy_from_slice(&digits);
                Flow::Next
            }
            StoreRegisters { x } => {
                let count = x as usize + 1;
                self.memory
                    .slice_mut(self.index_register as usize, count)?
                    .copy_from_slice(&v[..count]);
                Flow::Next
            }
            LoadRegisters { x } => {
                let count = x as usize + 1;
                let bytes = self.memory.slice(self.index_register as usize, count)?;
                v[..count].copy_from_slice(bytes);
                Flow::Next
            }
        };

        Ok(flow)
    }
}

impl<R, B, G> Machine<R, B, G> {
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// V0 through VF
    pub fn registers(&self) -> &[u8; 16] {
        &self.v_registers
    }

    pub fn index_register(&self) -> u16 {
        self.index_register
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn keys(&self) -> Keypad {
        self.keys
    }

    /// The register a pending `FX0A` will write to
    pub fn awaiting_key(&self) -> Option<u8> {
        self.key_wait_register
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn beeper(&self) -> &B {
        &self.beeper
    }
}

impl<R, B, G> fmt::Debug for Machine<R, B, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("program_counter", &format_args!("0x{:03x}", self.program_counter))
            .field("index_register", &format_args!("0x{:03x}", self.index_register))
            .field("v_registers", &self.v_registers)
            .field("stack", &self.stack.entries())
            .field("delay_timer", &self.delay_timer)
            .field("sound_timer", &self.sound_timer)
            .field("keys", &self.keys)
            .field("key_wait_register", &self.key_wait_register)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MachineError;
    use crate::testing::{HeldKeys, RecordingDiagnostics, TestMachine, machine_with};

    fn run(machine: &mut TestMachine, steps: usize) {
        for _ in 0..steps {
            machine.step().unwrap();
        }
    }

    #[test]
    fn load_byte_sets_exactly_the_register() {
        for x in 0..16u8 {
            for nn in [0x00, 0x01, 0x7F, 0x80, 0xFF] {
                let mut machine = machine_with(&[0x60 | x, nn]);
                machine.step().unwrap();

                assert_eq!(machine.registers()[x as usize], nn);
                assert_eq!(machine.program_counter(), 0x202);
            }
        }
    }

    #[test]
    fn add_byte_wraps_without_touching_vf() {
        let mut machine = machine_with(&[0x60, 0xF0, 0x6F, 0x55, 0x70, 0x20]);
        run(&mut machine, 3);

        assert_eq!(machine.registers()[0], 0x10);
        assert_eq!(machine.registers()[0xF], 0x55);
    }

    #[test]
    fn add_sets_carry() {
        for (a, b) in [(0x00u8, 0x00u8), (0x7F, 0x80), (0x80, 0x80), (0xFF, 0x01), (0xC8, 0x64)] {
            let mut machine = machine_with(&[0x61, a, 0x62, b, 0x81, 0x24]);
            run(&mut machine, 3);

            let sum = a as u16 + b as u16;
            assert_eq!(machine.registers()[1], (sum % 256) as u8);
            assert_eq!(machine.registers()[0xF], (sum > 255) as u8, "{a} + {b}");
        }
    }

    #[test]
    fn sub_flags_no_borrow() {
        let mut machine = machine_with(&[0x61, 0x05, 0x62, 0x03, 0x81, 0x25]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[1], 0x02);
        assert_eq!(machine.registers()[0xF], 1);

        let mut machine = machine_with(&[0x61, 0x03, 0x62, 0x05, 0x81, 0x25]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[1], 0xFE);
        assert_eq!(machine.registers()[0xF], 0);

        // equal operands do not borrow
        let mut machine = machine_with(&[0x61, 0x07, 0x62, 0x07, 0x81, 0x25]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[1], 0x00);
        assert_eq!(machine.registers()[0xF], 1);
    }

    #[test]
    fn reverse_sub_flags_no_borrow() {
        let mut machine = machine_with(&[0x61, 0x03, 0x62, 0x05, 0x81, 0x27]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[1], 0x02);
        assert_eq!(machine.registers()[0xF], 1);

        let mut machine = machine_with(&[0x61, 0x05, 0x62, 0x03, 0x81, 0x27]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[1], 0xFE);
        assert_eq!(machine.registers()[0xF], 0);
    }

    #[test]
    fn shifts_evict_into_vf() {
        let mut machine = machine_with(&[0x63, 0x81, 0x83, 0x06]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[3], 0x40);
        assert_eq!(machine.registers()[0xF], 1);

        let mut machine = machine_with(&[0x63, 0x81, 0x83, 0x0E]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[3], 0x02);
        assert_eq!(machine.registers()[0xF], 1);

        let mut machine = machine_with(&[0x63, 0x40, 0x83, 0x0E]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[3], 0x80);
        assert_eq!(machine.registers()[0xF], 0);
    }

    #[test]
    fn flag_wins_when_vf_is_the_destination() {
        // VF := 0xFF; VF += VF -> carry, so VF ends as the flag rather than the sum
        let mut machine = machine_with(&[0x6F, 0xFF, 0x8F, 0xF4]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0xF], 1);
    }

    #[test]
    fn bitwise_ops() {
        let mut machine = machine_with(&[
            0x61, 0b1100, 0x62, 0b1010, 0x80, 0x10, 0x80, 0x21, 0x63, 0b1100, 0x83, 0x22, 0x64,
            0b1100, 0x84, 0x23,
        ]);
        run(&mut machine, 8);

        assert_eq!(machine.registers()[0], 0b1110);
        assert_eq!(machine.registers()[3], 0b1000);
        assert_eq!(machine.registers()[4], 0b0110);
    }

    #[test]
    fn skips_advance_by_four() {
        // V0 == 0x12 -> skip
        let mut machine = machine_with(&[0x60, 0x12, 0x30, 0x12]);
        run(&mut machine, 2);
        assert_eq!(machine.program_counter(), 0x206);

        // V0 != 0x13 -> no skip for 3XNN
        let mut machine = machine_with(&[0x60, 0x12, 0x30, 0x13]);
        run(&mut machine, 2);
        assert_eq!(machine.program_counter(), 0x204);

        let mut machine = machine_with(&[0x60, 0x12, 0x40, 0x13]);
        run(&mut machine, 2);
        assert_eq!(machine.program_counter(), 0x206);

        let mut machine = machine_with(&[0x50, 0x10]);
        run(&mut machine, 1);
        assert_eq!(machine.program_counter(), 0x204);

        // V0 != V1 -> 9XY0 skips
        let mut machine = machine_with(&[0x60, 0x01, 0x90, 0x10]);
        run(&mut machine, 2);
        assert_eq!(machine.program_counter(), 0x206);

        let mut machine = machine_with(&[0x90, 0x10]);
        run(&mut machine, 1);
        assert_eq!(machine.program_counter(), 0x202);
    }

    #[test]
    fn jumps_do_not_auto_increment() {
        let mut machine = machine_with(&[0x13, 0x45]);
        machine.step().unwrap();
        assert_eq!(machine.program_counter(), 0x345);

        let mut machine = machine_with(&[0x60, 0x10, 0xB3, 0x00]);
        run(&mut machine, 2);
        assert_eq!(machine.program_counter(), 0x310);
    }

    #[test]
    fn call_and_return_balance() {
        // 0x200: CALL 0x208, 0x202: CLS, ... 0x208: CLS, 0x20A: RET
        let mut machine = machine_with(&[
            0x22, 0x08, 0x00, 0xE0, 0x00, 0xE0, 0x00, 0xE0, 0x00, 0xE0, 0x00, 0xEE,
        ]);

        machine.step().unwrap();
        assert_eq!(machine.stack().pointer(), 1);
        assert_eq!(machine.stack().entries(), &[0x200]);
        assert_eq!(machine.program_counter(), 0x208);

        run(&mut machine, 2);
        assert_eq!(machine.program_counter(), 0x202);
        assert_eq!(machine.stack().pointer(), 0);
    }

    #[test]
    fn nested_calls_sixteen_deep() {
        // each subroutine calls the next, the last one unwinds the chain
        let mut program = Vec::new();
        for level in 0..16u16 {
            let target = 0x200 + (level + 1) * 4;
            program.extend_from_slice(&[0x20 | (target >> 8) as u8, target as u8, 0x00, 0xEE]);
        }
        // 16 calls land here at 0x240
        program.extend_from_slice(&[0x00, 0xEE]);
        // the outermost return lands on 0x202, which returns once more; replace with a jump
        program[2] = 0x12;
        program[3] = 0x02;

        let mut machine = machine_with(&program);
        run(&mut machine, 16);
        assert_eq!(machine.stack().pointer(), 16);
        assert_eq!(machine.program_counter(), 0x240);

        run(&mut machine, 16);
        assert_eq!(machine.stack().pointer(), 0);
        assert_eq!(machine.program_counter(), 0x202);
    }

    #[test]
    fn call_on_full_stack_overflows() {
        // 0x200: CALL 0x200 recurses forever
        let mut machine = machine_with(&[0x22, 0x00]);
        run(&mut machine, 16);

        assert_eq!(machine.step(), Err(MachineError::StackOverflow { address: 0x200 }));
        assert_eq!(machine.program_counter(), 0x200);
    }

    #[test]
    fn return_on_empty_stack_underflows() {
        let mut machine = machine_with(&[0x00, 0xEE]);
        assert_eq!(
            machine.step(),
            Err(MachineError::StackUnderflow { address: 0x200 })
        );
    }

    #[test]
    fn random_is_masked() {
        let mut machine = machine_with(&[0xC4, 0x0F]);
        machine.step().unwrap();
        assert_eq!(machine.registers()[4], 0x0F);

        let mut machine = machine_with(&[0xC4, 0x00]);
        machine.step().unwrap();
        assert_eq!(machine.registers()[4], 0x00);
    }

    #[test]
    fn draw_reports_collisions_and_renders() {
        // I := glyph 0; draw at (0,0) twice
        let mut machine = machine_with(&[0x60, 0x00, 0xF0, 0x29, 0xD0, 0x05, 0xD0, 0x05]);
        run(&mut machine, 3);

        assert_eq!(machine.registers()[0xF], 0);
        assert!(machine.framebuffer().is_set(0, 0));
        assert_eq!(machine.renderer().frames.len(), 1);

        machine.step().unwrap();
        assert_eq!(machine.registers()[0xF], 1);
        assert!(machine.framebuffer().into_iter().all(|&c| c == 0));
        assert_eq!(machine.renderer().frames.len(), 2);
    }

    #[test]
    fn zero_row_draw_still_renders() {
        let mut machine = machine_with(&[0x6F, 0x01, 0xD0, 0x00]);
        run(&mut machine, 2);

        assert_eq!(machine.registers()[0xF], 0);
        assert_eq!(machine.renderer().frames.len(), 1);
    }

    #[test]
    fn zero_row_draw_ignores_index_past_memory() {
        // I := 0xFFF + 0xF0 lands outside the address space
        let mut machine =
            machine_with(&[0x6F, 0x01, 0xAF, 0xFF, 0x60, 0xF0, 0xF0, 0x1E, 0xD0, 0x00]);
        run(&mut machine, 4);
        assert_eq!(machine.index_register(), 0x10EF);

        assert_eq!(
            machine.step(),
            Ok(Cycle::Executed(Instruction::Draw { x: 0, y: 0, rows: 0 }))
        );
        assert_eq!(machine.registers()[0xF], 0);
        assert_eq!(machine.renderer().frames.len(), 1);
        assert_eq!(machine.program_counter(), 0x20A);
    }

    #[test]
    fn only_drawing_cycles_render() {
        let mut machine = machine_with(&[0x60, 0x01, 0x00, 0xE0, 0x61, 0x01]);
        run(&mut machine, 3);
        assert_eq!(machine.renderer().frames.len(), 1);
    }

    #[test]
    fn draw_past_memory_fails() {
        let mut machine = machine_with(&[0xAF, 0xFE, 0xD0, 0x05]);
        machine.step().unwrap();
        assert!(matches!(
            machine.step(),
            Err(MachineError::AddressOutOfBounds { .. })
        ));
        assert_eq!(machine.program_counter(), 0x202);
    }

    #[test]
    fn key_skips() {
        let mut machine = machine_with(&[0x65, 0x0A, 0xE5, 0x9E]);
        machine.apply_input(Keypad::KEY_A);
        run(&mut machine, 2);
        assert_eq!(machine.program_counter(), 0x206);

        let mut machine = machine_with(&[0x65, 0x0A, 0xE5, 0xA1]);
        machine.apply_input(Keypad::KEY_A);
        run(&mut machine, 2);
        assert_eq!(machine.program_counter(), 0x204);

        // keys past 0xF are never pressed
        let mut machine = machine_with(&[0x65, 0x1A, 0xE5, 0xA1]);
        machine.apply_input(Keypad::all());
        run(&mut machine, 2);
        assert_eq!(machine.program_counter(), 0x206);
    }

    #[test]
    fn wait_for_key_blocks_until_input() {
        let mut machine = machine_with(&[0xF3, 0x0A, 0x61, 0x01]);
        machine.step().unwrap();
        assert_eq!(machine.awaiting_key(), Some(3));

        let pc = machine.program_counter();
        let registers = *machine.registers();
        for _ in 0..20 {
            assert_eq!(machine.step(), Ok(Cycle::AwaitingKey));
        }
        machine.apply_input(Keypad::empty());
        assert_eq!(machine.step(), Ok(Cycle::AwaitingKey));
        assert_eq!(machine.program_counter(), pc);
        assert_eq!(machine.registers(), &registers);

        machine.poll_input(&HeldKeys(vec![0xC, 0x7]));
        assert_eq!(machine.awaiting_key(), None);
        assert_eq!(machine.registers()[3], 0x7);

        machine.step().unwrap();
        assert_eq!(machine.registers()[1], 0x01);
        assert_eq!(machine.program_counter(), 0x204);
    }

    #[test]
    fn timers_keep_running_while_waiting() {
        let mut machine = machine_with(&[0x60, 0x02, 0xF0, 0x15, 0xF1, 0x0A]);
        run(&mut machine, 3);
        assert_eq!(machine.awaiting_key(), Some(1));

        // default rate ticks once every 8 steps; 3 steps have already elapsed
        run(&mut machine, 5 + 8);
        assert_eq!(machine.delay_timer(), 0);
    }

    #[test]
    fn delay_timer_decays_to_zero() {
        let mut machine = machine_with(&[0x60, 0x05, 0xF0, 0x15, 0xF1, 0x07]);
        run(&mut machine, 2);
        assert_eq!(machine.delay_timer(), 5);

        for expected in (0..5).rev() {
            machine.tick_timers();
            assert_eq!(machine.delay_timer(), expected);
        }
        machine.tick_timers();
        assert_eq!(machine.delay_timer(), 0);

        machine.step().unwrap();
        assert_eq!(machine.registers()[1], 0);
    }

    #[test]
    fn sound_timer_beeps_once_on_expiry() {
        let mut machine = machine_with(&[0x60, 0x03, 0xF0, 0x18]);
        run(&mut machine, 2);
        assert_eq!(machine.sound_timer(), 3);

        machine.tick_timers();
        machine.tick_timers();
        assert_eq!(machine.beeper().beeps, 0);
        machine.tick_timers();
        assert_eq!(machine.beeper().beeps, 1);
        assert_eq!(machine.sound_timer(), 0);

        machine.tick_timers();
        assert_eq!(machine.beeper().beeps, 1);
    }

    #[test]
    fn step_drives_timers_through_the_divider() {
        // jump to self forever
        let mut machine = machine_with(&[0x60, 0x02, 0xF0, 0x15, 0x12, 0x04]);
        run(&mut machine, 7);
        assert_eq!(machine.delay_timer(), 2);
        run(&mut machine, 1);
        assert_eq!(machine.delay_timer(), 1);
        run(&mut machine, 8);
        assert_eq!(machine.delay_timer(), 0);
    }

    #[test]
    fn index_arithmetic() {
        let mut machine = machine_with(&[0xAF, 0xFF, 0x60, 0x02, 0xF0, 0x1E]);
        run(&mut machine, 3);
        assert_eq!(machine.index_register(), 0x1001);

        let mut machine = machine_with(&[0x6F, 0x09, 0xAF, 0xF0, 0x60, 0x20, 0xF0, 0x1E]);
        run(&mut machine, 4);
        assert_eq!(machine.index_register(), 0x1010);
        assert_eq!(machine.registers()[0xF], 0x09);
    }

    #[test]
    fn index_wraps_at_sixteen_bits() {
        // 0xFFF + 241 * 0xFF = 0x1000E
        let mut program = vec![0x6F, 0x07, 0xAF, 0xFF, 0x60, 0xFF];
        for _ in 0..241 {
            program.extend_from_slice(&[0xF0, 0x1E]);
        }
        let mut machine = machine_with(&program);
        run(&mut machine, 3 + 241);

        assert_eq!(machine.index_register(), 0x000E);
        assert_eq!(machine.registers()[0xF], 0x07);
    }

    #[test]
    fn glyph_addresses() {
        let mut machine = machine_with(&[0x6A, 0x0F, 0xFA, 0x29]);
        run(&mut machine, 2);
        assert_eq!(machine.index_register(), 75);
    }

    #[test]
    fn bcd_digits() {
        let mut machine = machine_with(&[0x60, 0xFE, 0xA3, 0x00, 0xF0, 0x33]);
        run(&mut machine, 3);

        assert_eq!(machine.memory().slice(0x300, 3).unwrap(), &[2, 5, 4]);
        assert_eq!(machine.index_register(), 0x300);
    }

    #[test]
    fn bcd_past_memory_fails_without_writing() {
        let mut machine = machine_with(&[0xAF, 0xFE, 0x60, 0xFE, 0xF0, 0x33]);
        run(&mut machine, 2);

        assert!(matches!(
            machine.step(),
            Err(MachineError::AddressOutOfBounds { .. })
        ));
        assert_eq!(machine.program_counter(), 0x204);
        assert_eq!(machine.memory().slice(0xFFE, 2).unwrap(), &[0, 0]);
    }

    #[test]
    fn register_block_copies_leave_index_alone() {
        let mut machine = machine_with(&[
            0x60, 0x11, 0x61, 0x22, 0x62, 0x33, 0xA3, 0x00, 0xF1, 0x55, 0x60, 0x00, 0x61, 0x00,
            0xF1, 0x65,
        ]);
        run(&mut machine, 5);
        assert_eq!(machine.memory().slice(0x300, 3).unwrap(), &[0x11, 0x22, 0x00]);
        assert_eq!(machine.index_register(), 0x300);

        run(&mut machine, 3);
        assert_eq!(&machine.registers()[..3], &[0x11, 0x22, 0x33]);
        assert_eq!(machine.index_register(), 0x300);
    }

    #[test]
    fn register_store_past_memory_fails_without_writing() {
        let mut machine = machine_with(&[0xAF, 0xFE, 0x60, 0x42, 0xF3, 0x55]);
        run(&mut machine, 2);

        assert!(matches!(
            machine.step(),
            Err(MachineError::AddressOutOfBounds { .. })
        ));
        assert_eq!(machine.memory().read(0xFFE).unwrap(), 0);
    }

    #[test]
    fn register_load_past_memory_fails_without_loading() {
        let mut machine = machine_with(&[
            0xAF, 0xFE, 0x60, 0x11, 0x61, 0x22, 0x62, 0x33, 0x63, 0x44, 0xF3, 0x65,
        ]);
        run(&mut machine, 5);

        assert!(matches!(
            machine.step(),
            Err(MachineError::AddressOutOfBounds { .. })
        ));
        assert_eq!(machine.program_counter(), 0x20A);
        assert_eq!(machine.registers()[..4], [0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn running_off_the_end_hits_the_sentinel() {
        let mut machine = machine_with(&[0x60, 0x01]);
        machine.step().unwrap();

        assert_eq!(machine.step(), Ok(Cycle::DecodeFault(0x0EFD)));
        assert_eq!(machine.program_counter(), 0x204);
    }

    #[test]
    fn fetch_past_memory_fails() {
        let mut machine = machine_with(&[0x1F, 0xFF]);
        machine.step().unwrap();
        assert_eq!(
            machine.step(),
            Err(MachineError::AddressOutOfBounds { address: 0x1000 })
        );
    }

    #[test]
    fn decode_faults_reach_diagnostics() {
        let diagnostics = RecordingDiagnostics::default();
        let messages = diagnostics.messages.clone();
        let mut machine = machine_with(&[0x01, 0x23]).with_diagnostics(Box::new(diagnostics));

        assert_eq!(machine.step(), Ok(Cycle::DecodeFault(0x0123)));
        assert_eq!(
            messages.borrow().last().map(String::as_str),
            Some("Invalid opcode = 0x0123")
        );
    }

    #[test]
    fn reset_restores_power_on_state() {
        let mut machine = machine_with(&[0x60, 0x05, 0xF0, 0x15, 0x22, 0x00]);
        run(&mut machine, 3);
        machine.apply_input(Keypad::KEY_1);

        machine.reset();

        assert_eq!(machine.program_counter(), 0x200);
        assert_eq!(machine.registers(), &[0; 16]);
        assert_eq!(machine.delay_timer(), 0);
        assert_eq!(machine.stack().pointer(), 0);
        assert_eq!(machine.keys(), Keypad::empty());
        assert_eq!(machine.memory().read(0x200).unwrap(), 0);
        assert_eq!(machine.memory().read(0).unwrap(), 0xF0);
        assert_eq!(machine.renderer().initialized, 2);
    }

    #[test]
    #[should_panic(expected = "not supported")]
    fn dumping_to_a_log_only_sink_panics() {
        let mut machine =
            machine_with(&[]).with_diagnostics(Box::new(RecordingDiagnostics::default()));
        machine.dump_state();
    }
}
