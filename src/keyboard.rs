use chip8_vm::InputSource;
use chip8_vm::keypad::KEY_COUNT;

/// Keys currently held on the physical keyboard, by CHIP-8 key index
#[derive(Debug, Default)]
pub struct KeyboardState {
    keys: [bool; KEY_COUNT],
}

impl KeyboardState {
    pub fn press_key(&mut self, key_index: usize) {
        if key_index >= KEY_COUNT {
            log::warn!("Discarding out of range keypress: {}", key_index);
            return;
        }

        log::debug!("Pressing key: {:X}", key_index);
        self.keys[key_index] = true;
    }

    pub fn release_key(&mut self, key_index: usize) {
        if key_index >= KEY_COUNT {
            log::warn!("Discarding out of range key release: {}", key_index);
            return;
        }

        log::debug!("Releasing key: {:X}", key_index);
        self.keys[key_index] = false;
    }

    pub fn release_all(&mut self) {
        self.keys = [false; KEY_COUNT];
    }
}

impl InputSource for KeyboardState {
    fn poll(&self, keys: &mut [bool; KEY_COUNT]) {
        keys.copy_from_slice(&self.keys);
    }
}

/// Maps a typed character to a CHIP-8 key index.
///
/// ```text
/// 1 2 3 4        1 2 3 C
/// q w e r   ->   4 5 6 D
/// a s d f        7 8 9 E
/// z x c v        A 0 B F
/// ```
pub fn map_key_to_index(key_text: &str) -> Option<usize> {
    match key_text {
        "1" => Some(0x1),
        "2" => Some(0x2),
        "3" => Some(0x3),
        "4" => Some(0xC),
        "q" => Some(0x4),
        "w" => Some(0x5),
        "e" => Some(0x6),
        "r" => Some(0xD),
        "a" => Some(0x7),
        "s" => Some(0x8),
        "d" => Some(0x9),
        "f" => Some(0xE),
        "z" => Some(0xA),
        "x" => Some(0x0),
        "c" => Some(0xB),
        "v" => Some(0xF),
        _ => None,
    }
}
