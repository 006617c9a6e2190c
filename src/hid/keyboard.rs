//! Keyboard input report: modifier bitfield and a single key code
//! (report id 1 in [`KEYBOARD`](super::report_map::KEYBOARD)).

pub const KEYBOARD_REPORT_SIZE: usize = 2;

pub const MOD_LEFT_CTRL: u8 = 0x01;
pub const MOD_LEFT_SHIFT: u8 = 0x02;
pub const MOD_LEFT_ALT: u8 = 0x04;
pub const MOD_LEFT_GUI: u8 = 0x08;

/// Usage ID of the `m` key on the Keyboard/Keypad page.
pub const KEY_M: u8 = 0x10;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifier: u8,
    pub keycode: u8,
}

impl KeyboardReport {
    pub fn key(modifier: u8, keycode: u8) -> Self {
        KeyboardReport { modifier, keycode }
    }

    pub fn release() -> Self {
        KeyboardReport::default()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        vec![self.modifier, self.keycode]
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        match data {
            [modifier, keycode, ..] => Some(KeyboardReport {
                modifier: *modifier,
                keycode: *keycode,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capital_m() {
        let report = KeyboardReport::key(MOD_LEFT_SHIFT, KEY_M);
        assert_eq!(report.to_bytes(), vec![0x02, 0x10]);
        assert_eq!(KeyboardReport::release().to_bytes(), vec![0x00, 0x00]);
        assert_eq!(KeyboardReport::from_bytes(&[0x02, 0x10]), Some(report));
        assert_eq!(KeyboardReport::from_bytes(&[0x02]), None);
    }
}
