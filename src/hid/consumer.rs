//! Consumer Control report (usage page 0x0C): one 16-bit usage, little
//! endian, report id 2 in [`KEYBOARD`](super::report_map::KEYBOARD).

pub const CONSUMER_REPORT_SIZE: usize = 2;

/// Common consumer control usage codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ConsumerUsage {
    None = 0x0000,
    Sleep = 0x0032,
    NextTrack = 0x00B5,
    PrevTrack = 0x00B6,
    Stop = 0x00B7,
    PlayPause = 0x00CD,
    Mute = 0x00E2,
    VolumeUp = 0x00E9,
    VolumeDown = 0x00EA,
    BrowserHome = 0x0223,
    BrowserBack = 0x0224,
}

impl From<u16> for ConsumerUsage {
    fn from(code: u16) -> Self {
        match code {
            0x0032 => ConsumerUsage::Sleep,
            0x00B5 => ConsumerUsage::NextTrack,
            0x00B6 => ConsumerUsage::PrevTrack,
            0x00B7 => ConsumerUsage::Stop,
            0x00CD => ConsumerUsage::PlayPause,
            0x00E2 => ConsumerUsage::Mute,
            0x00E9 => ConsumerUsage::VolumeUp,
            0x00EA => ConsumerUsage::VolumeDown,
            0x0223 => ConsumerUsage::BrowserHome,
            0x0224 => ConsumerUsage::BrowserBack,
            _ => ConsumerUsage::None,
        }
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct ConsumerReport {
    pub usage: u16,
}

impl ConsumerReport {
    pub fn pressed(usage: ConsumerUsage) -> Self {
        ConsumerReport { usage: usage as u16 }
    }

    pub fn release() -> Self {
        ConsumerReport::default()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.usage.to_le_bytes().to_vec()
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        match data {
            [lo, hi, ..] => Some(ConsumerReport {
                usage: u16::from_le_bytes([*lo, *hi]),
            }),
            _ => None,
        }
    }

    pub fn usage(&self) -> ConsumerUsage {
        ConsumerUsage::from(self.usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_up() {
        let report = ConsumerReport::pressed(ConsumerUsage::VolumeUp);
        assert_eq!(report.to_bytes(), vec![0xe9, 0x00]);
        assert_eq!(
            ConsumerReport::from_bytes(&[0x23, 0x02]).unwrap().usage(),
            ConsumerUsage::BrowserHome
        );
    }
}
