//! Hexadecimal keypad.
use std::fmt;

use crate::constants::*;

/// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
#[derive(Debug, Default, Clone)]
pub struct Keypad {
    state: u16,
    /// Most recent key to go from released to pressed.
    ///
    /// Consumed by the key wait instruction.
    latch: Option<KeyCode>,
}

impl Keypad {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set a key's state, latching it if it just went down.
    pub fn set(&mut self, key: KeyCode, pressed: bool) {
        let mask = 1 << key.as_u8();

        if pressed {
            if self.state & mask == 0 {
                self.latch = Some(key);
            }
            self.state |= mask;
        } else {
            self.state &= !mask;
        }
    }

    /// Check whether the given key is down.
    ///
    /// Only the low nibble of the key id is used.
    #[inline]
    pub fn is_pressed(&self, key_id: u8) -> bool {
        self.state & (1 << (key_id & 0xF)) > 0
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.state > 0
    }

    /// Retrieve the value of the first key that is pressed down.
    pub fn first_key(&self) -> Option<KeyCode> {
        KeyCode::ALL
            .into_iter()
            .find(|key| self.is_pressed(key.as_u8()))
    }

    /// Take the latched key press, if any.
    pub(crate) fn take_latch(&mut self) -> Option<KeyCode> {
        self.latch.take()
    }

    /// Forget any key press that happened before now.
    pub(crate) fn clear_latch(&mut self) {
        self.latch = None;
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear(&mut self) {
        self.state = 0;
        self.latch = None;
    }

    /// Raw bitfield, bit `n` for key `n`.
    pub fn bits(&self) -> u16 {
        self.state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    pub const ALL: [KeyCode; KEY_COUNT as usize] = [
        Self::Key0,
        Self::Key1,
        Self::Key2,
        Self::Key3,
        Self::Key4,
        Self::Key5,
        Self::Key6,
        Self::Key7,
        Self::Key8,
        Self::Key9,
        Self::KeyA,
        Self::KeyB,
        Self::KeyC,
        Self::KeyD,
        Self::KeyE,
        Self::KeyF,
    ];

    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(key_id as usize)
            .copied()
            .ok_or(InvalidKeyCode(key_id))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidKeyCode(pub u8);

impl std::error::Error for InvalidKeyCode {}

impl fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "keycode must be in range 0 <= keycode < 16, got {}",
            self.0
        )
    }
}
