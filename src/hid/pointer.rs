//! Absolute pointer report for the gesture mouse.
//!
//! Layout (5 bytes): buttons (3 bits + 5 padding), X and Y as signed 16-bit
//! little endian.

use super::bits::{BitReader, BitWriter};

pub const POINTER_REPORT_SIZE: usize = 5;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct PointerReport {
    pub buttons: u8,
    pub x: i16,
    pub y: i16,
}

impl PointerReport {
    /// Gesture coordinates (0..=127) go to the high byte of each axis.
    pub fn from_gesture(x: u8, y: u8, pressed: bool) -> Self {
        PointerReport {
            buttons: u8::from(pressed),
            x: i16::from(x.min(0x7f)) << 8,
            y: i16::from(y.min(0x7f)) << 8,
        }
    }

    pub fn released(&self) -> Self {
        PointerReport {
            buttons: 0,
            ..*self
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer
            .write(u32::from(self.buttons & 0x07), 3)
            .pad(5)
            .write_signed(i32::from(self.x), 16)
            .write_signed(i32::from(self.y), 16);
        writer.finish()
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < POINTER_REPORT_SIZE {
            return None;
        }
        let mut reader = BitReader::new(data);
        let buttons = reader.read(3)? as u8;
        reader.skip(5)?;
        Some(PointerReport {
            buttons,
            x: reader.read_signed(16)? as i16,
            y: reader.read_signed(16)? as i16,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gesture_sample_lands_in_high_byte() {
        let report = PointerReport::from_gesture(100, 20, true);
        assert_eq!(report.to_bytes(), vec![0x01, 0x00, 100, 0x00, 20]);
        assert_eq!(report.released().to_bytes(), vec![0x00, 0x00, 100, 0x00, 20]);
        assert_eq!(PointerReport::from_bytes(&report.to_bytes()), Some(report));
    }

    #[test]
    fn clamps_to_positive_range() {
        let report = PointerReport::from_gesture(255, 0, false);
        assert_eq!(report.x, 0x7f00);
    }
}
