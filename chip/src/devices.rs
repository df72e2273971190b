use crate::definitions::keyboard;

#[cfg_attr(test, mockall::automock)]
/// The traits responsible for the display based code
pub trait DisplayCommands {
    /// Will display all from the pixels, the buffer is stored row by row
    /// with one byte per pixel.
    fn display(&mut self, pixels: &[u8]);
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for reading the host keyboard state
pub trait KeyboardCommands {
    /// The current state of all the hex keys, indexed by key code.
    fn keys(&mut self) -> [bool; keyboard::SIZE];
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for the sound output
pub trait SoundCommands {
    /// Emits a single beep.
    fn beep(&mut self);
}

/// Used if the host has no sound output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSound;

impl SoundCommands for NoSound {
    fn beep(&mut self) {
        log::trace!("beep");
    }
}

/// Input is done with a hex keyboard that has 16 keys ranging `0-F`. The `8`, `4`, `6`, and
/// `2` keys are typically used for directional input. Three opcodes are used to detect input.
/// One skips an instruction if a specific key is pressed, while another does the same if a
/// specific key is not pressed. The third waits for a key press, and then stores it in one of
/// the data registers.
///
/// Key codes outside of `0x0-0xF` are ignored, as a host may report keys
/// it has no mapping for.
#[derive(Default, Debug, Clone)]
pub struct Keypad {
    keys: [bool; keyboard::SIZE],
}

impl Keypad {
    pub fn new() -> Self {
        Keypad::default()
    }

    pub fn enable_key(&mut self, code: u8) {
        self.set_key(code, true);
    }

    pub fn disable_key(&mut self, code: u8) {
        self.set_key(code, false);
    }

    pub fn set_key(&mut self, code: u8, to: bool) {
        if let Some(key) = self.keys.get_mut(code as usize) {
            *key = to;
        } else {
            log::debug!("ignoring unmapped key {:#X}", code);
        }
    }

    /// Overwrites the full keypad state at once.
    pub fn set_keys(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keys = *keys;
    }

    pub fn is_key_pressed(&self, code: u8) -> bool {
        self.keys.get(code as usize).copied().unwrap_or(false)
    }

    pub fn is_any_key_pressed(&self) -> bool {
        self.keys.iter().any(|key| *key)
    }

    /// The pressed key with the lowest code, if there is any.
    pub fn pressed_key_code(&self) -> Option<u8> {
        self.keys.iter().position(|key| *key).map(|code| code as u8)
    }

    pub fn keys(&self) -> &[bool] {
        &self.keys[..]
    }

    pub fn reset(&mut self) {
        self.keys = [false; keyboard::SIZE];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_disable() {
        let mut keypad = Keypad::new();
        assert!(!keypad.is_any_key_pressed());

        keypad.enable_key(0xA);
        assert!(keypad.is_key_pressed(0xA));
        assert!(keypad.is_any_key_pressed());
        assert_eq!(Some(0xA), keypad.pressed_key_code());

        keypad.disable_key(0xA);
        assert!(!keypad.is_key_pressed(0xA));
        assert_eq!(None, keypad.pressed_key_code());
    }

    #[test]
    fn test_unmapped_keys() {
        let mut keypad = Keypad::new();
        keypad.enable_key(0x10);
        keypad.enable_key(0xFF);
        keypad.disable_key(0x42);

        assert!(!keypad.is_any_key_pressed());
        assert!(!keypad.is_key_pressed(0x10));
        assert!(!keypad.is_key_pressed(0xFF));
    }

    #[test]
    fn test_lowest_key_wins() {
        let mut keypad = Keypad::new();
        keypad.enable_key(0xE);
        keypad.enable_key(0x3);
        keypad.enable_key(0x7);
        assert_eq!(Some(0x3), keypad.pressed_key_code());
    }

    #[test]
    fn test_set_keys() {
        let mut keypad = Keypad::new();
        let mut keys = [false; keyboard::SIZE];
        keys[0x5] = true;
        keys[0xF] = true;
        keypad.set_keys(&keys);
        assert_eq!(keypad.keys(), &keys[..]);

        keypad.reset();
        assert!(!keypad.is_any_key_pressed());
    }

    #[test]
    fn test_layout_covers_all_keys() {
        let mut seen: Vec<u8> = keyboard::LAYOUT.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..keyboard::SIZE as u8).collect::<Vec<_>>());
    }
}
