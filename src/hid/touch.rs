//! Single-contact digitizer report.
//!
//! Layout (7 bytes): contact count, contact id, tip switch (bit 0) and in
//! range (bit 1) with 6 padding bits, then X and Y as 16-bit little endian in
//! 0..=10000.

use super::bits::{BitReader, BitWriter};

pub const TOUCH_REPORT_SIZE: usize = 7;
pub const TOUCH_MAX: u16 = 10_000;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct TouchReport {
    pub contact_count: u8,
    pub contact_id: u8,
    pub tip_switch: bool,
    pub in_range: bool,
    pub x: u16,
    pub y: u16,
}

impl TouchReport {
    pub fn touch(contact_id: u8, x: u16, y: u16) -> Self {
        TouchReport {
            contact_count: 1,
            contact_id,
            tip_switch: true,
            in_range: true,
            x: x.min(TOUCH_MAX),
            y: y.min(TOUCH_MAX),
        }
    }

    pub fn lifted(&self) -> Self {
        TouchReport {
            tip_switch: false,
            in_range: false,
            ..*self
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer
            .write(u32::from(self.contact_count), 8)
            .write(u32::from(self.contact_id), 8)
            .write_bool(self.tip_switch)
            .write_bool(self.in_range)
            .pad(6)
            .write(u32::from(self.x), 16)
            .write(u32::from(self.y), 16);
        writer.finish()
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < TOUCH_REPORT_SIZE {
            return None;
        }
        let mut reader = BitReader::new(data);
        let contact_count = reader.read(8)? as u8;
        let contact_id = reader.read(8)? as u8;
        let tip_switch = reader.read_bool()?;
        let in_range = reader.read_bool()?;
        reader.skip(6)?;
        Some(TouchReport {
            contact_count,
            contact_id,
            tip_switch,
            in_range,
            x: reader.read(16)? as u16,
            y: reader.read(16)? as u16,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_and_lift() {
        let touch = TouchReport::touch(1, 1500, 1000);
        assert_eq!(touch.to_bytes(), vec![0x01, 0x01, 0x03, 0xdc, 0x05, 0xe8, 0x03]);
        assert_eq!(touch.lifted().to_bytes()[2], 0x00);
        assert_eq!(TouchReport::from_bytes(&touch.to_bytes()), Some(touch));
        assert_eq!(TouchReport::touch(1, 20_000, 0).x, TOUCH_MAX);
    }
}
