use std::fmt;

/// The raw fields of a 16-bit opcode.
///
/// ```text
/// class  x    y    n
/// [____][____][____][____]
///             [   nn     ]
///       [      nnn       ]
/// ```
///
/// Every word decodes to some field tuple, recognized or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub word: u16,
    pub class: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl Opcode {
    pub const fn decode(word: u16) -> Self {
        Self {
            word,
            class: ((word & 0xF000) >> 12) as u8,
            x: ((word & 0x0F00) >> 8) as u8,
            y: ((word & 0x00F0) >> 4) as u8,
            n: (word & 0x000F) as u8,
            nn: (word & 0x00FF) as u8,
            nnn: word & 0x0FFF,
        }
    }
}

impl From<u16> for Opcode {
    fn from(word: u16) -> Self {
        Self::decode(word)
    }
}

/// One recognized CHIP-8 instruction with its operands.
///
/// Register operands are indices `0x0..=0xF` into `V0..=VF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `00E0`
    ClearScreen,
    /// `00EE`
    Return,
    /// `1NNN`
    Jump(u16),
    /// `2NNN`
    Call(u16),
    /// `3XNN`
    SkipIfEqualByte { x: u8, byte: u8 },
    /// `4XNN`
    SkipIfNotEqualByte { x: u8, byte: u8 },
    /// `5XY0`
    SkipIfEqual { x: u8, y: u8 },
    /// `6XNN`
    LoadByte { x: u8, byte: u8 },
    /// `7XNN`
    AddByte { x: u8, byte: u8 },
    /// `8XY0`
    Copy { x: u8, y: u8 },
    /// `8XY1`
    Or { x: u8, y: u8 },
    /// `8XY2`
    And { x: u8, y: u8 },
    /// `8XY3`
    Xor { x: u8, y: u8 },
    /// `8XY4`
    Add { x: u8, y: u8 },
    /// `8XY5`
    Sub { x: u8, y: u8 },
    /// `8XY6`
    ShiftRight { x: u8 },
    /// `8XY7`
    SubReverse { x: u8, y: u8 },
    /// `8XYE`
    ShiftLeft { x: u8 },
    /// `9XY0`
    SkipIfNotEqual { x: u8, y: u8 },
    /// `ANNN`
    LoadIndex(u16),
    /// `BNNN`
    JumpOffset(u16),
    /// `CXNN`
    Random { x: u8, mask: u8 },
    /// `DXYN`
    Draw { x: u8, y: u8, rows: u8 },
    /// `EX9E`
    SkipIfKeyPressed { x: u8 },
    /// `EXA1`
    SkipIfKeyNotPressed { x: u8 },
    /// `FX07`
    LoadDelay { x: u8 },
    /// `FX0A`
    WaitForKey { x: u8 },
    /// `FX15`
    SetDelay { x: u8 },
    /// `FX18`
    SetSound { x: u8 },
    /// `FX1E`
    AddIndex { x: u8 },
    /// `FX29`
    LoadGlyph { x: u8 },
    /// `FX33`
    StoreBcd { x: u8 },
    /// `FX55`
    StoreRegisters { x: u8 },
    /// `FX65`
    LoadRegisters { x: u8 },
}

impl Instruction {
    /// Selects the instruction for an opcode, or `None` if the word is not part of the
    /// original instruction set (including every `0NNN` other than `00E0`/`00EE`).
    pub fn decode(op: Opcode) -> Option<Self> {
        use Instruction::*;

        let Opcode { x, y, n, nn, nnn, .. } = op;

        let instruction = match (op.class, x, y, n) {
            (0x0, 0x0, 0xE, 0x0) => ClearScreen,
            (0x0, 0x0, 0xE, 0xE) => Return,
            (0x1, ..) => Jump(nnn),
            (0x2, ..) => Call(nnn),
            (0x3, ..) => SkipIfEqualByte { x, byte: nn },
            (0x4, ..) => SkipIfNotEqualByte { x, byte: nn },
            (0x5, .., 0x0) => SkipIfEqual { x, y },
            (0x6, ..) => LoadByte { x, byte: nn },
            (0x7, ..) => AddByte { x, byte: nn },
            (0x8, .., 0x0) => Copy { x, y },
            (0x8, .., 0x1) => Or { x, y },
            (0x8, .., 0x2) => And { x, y },
            (0x8, .., 0x3) => Xor { x, y },
            (0x8, .., 0x4) => Add { x, y },
            (0x8, .., 0x5) => Sub { x, y },
            (0x8, .., 0x6) => ShiftRight { x },
            (0x8, .., 0x7) => SubReverse { x, y },
            (0x8, .., 0xE) => ShiftLeft { x },
            (0x9, .., 0x0) => SkipIfNotEqual { x, y },
            (0xA, ..) => LoadIndex(nnn),
            (0xB, ..) => JumpOffset(nnn),
            (0xC, ..) => Random { x, mask: nn },
            (0xD, ..) => Draw { x, y, rows: n },
            (0xE, _, 0x9, 0xE) => SkipIfKeyPressed { x },
            (0xE, _, 0xA, 0x1) => SkipIfKeyNotPressed { x },
            (0xF, _, 0x0, 0x7) => LoadDelay { x },
            (0xF, _, 0x0, 0xA) => WaitForKey { x },
            (0xF, _, 0x1, 0x5) => SetDelay { x },
            (0xF, _, 0x1, 0x8) => SetSound { x },
            (0xF, _, 0x1, 0xE) => AddIndex { x },
            (0xF, _, 0x2, 0x9) => LoadGlyph { x },
            (0xF, _, 0x3, 0x3) => StoreBcd { x },
            (0xF, _, 0x5, 0x5) => StoreRegisters { x },
            (0xF, _, 0x6, 0x5) => LoadRegisters { x },
            _ => return None,
        };

        Some(instruction)
    }

    /// Whether the instruction writes to the framebuffer
    pub fn draws(&self) -> bool {
        matches!(self, Instruction::ClearScreen | Instruction::Draw { .. })
    }
}

impl TryFrom<u16> for Instruction {
    type Error = u16;

    fn try_from(word: u16) -> Result<Self, Self::Error> {
        Self::decode(Opcode::decode(word)).ok_or(word)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump(addr) => write!(f, "JP 0x{addr:03X}"),
            Call(addr) => write!(f, "CALL 0x{addr:03X}"),
            SkipIfEqualByte { x, byte } => write!(f, "SE V{x:X}, 0x{byte:02X}"),
            SkipIfNotEqualByte { x, byte } => write!(f, "SNE V{x:X}, 0x{byte:02X}"),
            SkipIfEqual { x, y } => write!(f, "SE V{x:X}, V{y:X}"),
            LoadByte { x, byte } => write!(f, "LD V{x:X}, 0x{byte:02X}"),
            AddByte { x, byte } => write!(f, "ADD V{x:X}, 0x{byte:02X}"),
            Copy { x, y } => write!(f, "LD V{x:X}, V{y:X}"),
            Or { x, y } => write!(f, "OR V{x:X}, V{y:X}"),
            And { x, y } => write!(f, "AND V{x:X}, V{y:X}"),
            Xor { x, y } => write!(f, "XOR V{x:X}, V{y:X}"),
            Add { x, y } => write!(f, "ADD V{x:X}, V{y:X}"),
            Sub { x, y } => write!(f, "SUB V{x:X}, V{y:X}"),
            ShiftRight { x } => write!(f, "SHR V{x:X}"),
            SubReverse { x, y } => write!(f, "SUBN V{x:X}, V{y:X}"),
            ShiftLeft { x } => write!(f, "SHL V{x:X}"),
            SkipIfNotEqual { x, y } => write!(f, "SNE V{x:X}, V{y:X}"),
            LoadIndex(addr) => write!(f, "LD I, 0x{addr:03X}"),
            JumpOffset(addr) => write!(f, "JP V0, 0x{addr:03X}"),
            Random { x, mask } => write!(f, "RND V{x:X}, 0x{mask:02X}"),
            Draw { x, y, rows } => write!(f, "DRW V{x:X}, V{y:X}, {rows}"),
            SkipIfKeyPressed { x } => write!(f, "SKP V{x:X}"),
            SkipIfKeyNotPressed { x } => write!(f, "SKNP V{x:X}"),
            LoadDelay { x } => write!(f, "LD V{x:X}, DT"),
            WaitForKey { x } => write!(f, "LD V{x:X}, K"),
            SetDelay { x } => write!(f, "LD DT, V{x:X}"),
            SetSound { x } => write!(f, "LD ST, V{x:X}"),
            AddIndex { x } => write!(f, "ADD I, V{x:X}"),
            LoadGlyph { x } => write!(f, "LD F, V{x:X}"),
            StoreBcd { x } => write!(f, "LD B, V{x:X}"),
            StoreRegisters { x } => write!(f, "LD [I], V{x:X}"),
            LoadRegisters { x } => write!(f, "LD V{x:X}, [I]"),
        }
    }
}
