use bitflags::bitflags;

/// Number of keys on the hexadecimal keypad
pub const KEY_COUNT: usize = 16;

bitflags! {
    /// Pressed state of the 16-key hexadecimal keypad, bit `k` set while key `k` is down
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Keypad: u16 {
        const KEY_0 = 1 << 0x0;
        const KEY_1 = 1 << 0x1;
        const KEY_2 = 1 << 0x2;
        const KEY_3 = 1 << 0x3;
        const KEY_4 = 1 << 0x4;
        const KEY_5 = 1 << 0x5;
        const KEY_6 = 1 << 0x6;
        const KEY_7 = 1 << 0x7;
        const KEY_8 = 1 << 0x8;
        const KEY_9 = 1 << 0x9;
        const KEY_A = 1 << 0xA;
        const KEY_B = 1 << 0xB;
        const KEY_C = 1 << 0xC;
        const KEY_D = 1 << 0xD;
        const KEY_E = 1 << 0xE;
        const KEY_F = 1 << 0xF;
    }
}

impl Keypad {
    /// The flag for key `index`, or `None` past `0xF`
    pub fn key(index: u8) -> Option<Self> {
        if (index as usize) < KEY_COUNT {
            Some(Self::from_bits_retain(1 << index))
        } else {
            None
        }
    }

    /// Builds a keypad from one boolean per key
    pub fn from_states(states: &[bool; KEY_COUNT]) -> Self {
        states
            .iter()
            .enumerate()
            .filter(|(_, pressed)| **pressed)
            .fold(Self::empty(), |keys, (index, _)| {
                keys | Self::from_bits_retain(1 << index)
            })
    }

    /// Whether key `index` is down. Indices past `0xF` are never pressed.
    pub fn is_pressed(&self, index: u8) -> bool {
        Self::key(index).is_some_and(|key| self.contains(key))
    }

    /// The smallest pressed key index
    pub fn lowest_pressed(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.bits().trailing_zeros() as u8)
        }
    }
}
