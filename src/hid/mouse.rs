//! Four-byte relative mouse report, report id 1 of
//! [`RELATIVE_MOUSE`](super::report_map::RELATIVE_MOUSE).
//!
//! The first byte carries the left, right and middle buttons in its low
//! three bits. The remaining bytes are signed deltas for X, Y and the wheel.

use super::bits::{BitReader, BitWriter};

pub const MOUSE_REPORT_SIZE: usize = 4;

pub const BUTTON_LEFT: u8 = 0x01;
pub const BUTTON_RIGHT: u8 = 0x02;
pub const BUTTON_MIDDLE: u8 = 0x04;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct MouseReport {
    /// Button bitfield (bit 0 = left, bit 1 = right, bit 2 = middle).
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
}

impl MouseReport {
    pub fn moved(x: i8, y: i8) -> Self {
        MouseReport {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer
            .write(u32::from(self.buttons & 0x07), 3)
            .pad(5)
            .write_signed(i32::from(self.x), 8)
            .write_signed(i32::from(self.y), 8)
            .write_signed(i32::from(self.wheel), 8);
        writer.finish()
    }

    /// Accepts 3-byte (no wheel) or 4-byte reports.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 3 {
            return None;
        }
        let mut reader = BitReader::new(data);
        let buttons = reader.read(3)? as u8;
        reader.skip(5)?;
        Some(MouseReport {
            buttons,
            x: reader.read_signed(8)? as i8,
            y: reader.read_signed(8)? as i8,
            wheel: reader.read_signed(8).map(|wheel| wheel as i8).unwrap_or(0),
        })
    }

    pub fn is_idle(&self) -> bool {
        self.buttons == 0 && self.x == 0 && self.y == 0 && self.wheel == 0
    }
}
