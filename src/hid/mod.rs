//! HID report codec: report maps, a report descriptor parser, bit packing and
//! the fixed-layout input reports sent over the HID Report characteristic.

pub mod bits;
pub mod consumer;
pub mod descriptor;
pub mod keyboard;
pub mod mouse;
pub mod pointer;
pub mod report_map;
pub mod touch;

pub use consumer::{ConsumerReport, ConsumerUsage};
pub use descriptor::{ReportDescriptor, ReportKind};
pub use keyboard::KeyboardReport;
pub use mouse::MouseReport;
pub use pointer::PointerReport;
pub use touch::TouchReport;

pub const HID_SERVICE: u16 = 0x1812;
pub const HID_INFORMATION: u16 = 0x2A4A;
pub const REPORT_MAP: u16 = 0x2A4B;
pub const HID_CONTROL_POINT: u16 = 0x2A4C;
pub const REPORT: u16 = 0x2A4D;
pub const PROTOCOL_MODE: u16 = 0x2A4E;
pub const REPORT_REFERENCE: u16 = 0x2908;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HidReport {
    Mouse(MouseReport),
    Pointer(PointerReport),
    Touch(TouchReport),
    Keyboard(KeyboardReport),
    Consumer(ConsumerReport),
}

impl HidReport {
    /// Payload as sent in a GATT Report notification (no report id).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            HidReport::Mouse(report) => report.to_bytes(),
            HidReport::Pointer(report) => report.to_bytes(),
            HidReport::Touch(report) => report.to_bytes(),
            HidReport::Keyboard(report) => report.to_bytes(),
            HidReport::Consumer(report) => report.to_bytes(),
        }
    }

    /// Report prefixed with its id, as framed on USB and in boot mode.
    pub fn framed(&self, report_id: u8) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8);
        bytes.push(report_id);
        bytes.extend(self.to_bytes());
        bytes
    }
}

/// HID Information characteristic value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HidInformation {
    pub bcd_hid: u16,
    pub country_code: u8,
    pub flags: u8,
}

impl HidInformation {
    pub const REMOTE_WAKE: u8 = 0x01;
    pub const NORMALLY_CONNECTABLE: u8 = 0x02;

    pub fn new(bcd_hid: u16) -> Self {
        HidInformation {
            bcd_hid,
            country_code: 0,
            flags: Self::NORMALLY_CONNECTABLE,
        }
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        let [lo, hi] = self.bcd_hid.to_le_bytes();
        [lo, hi, self.country_code, self.flags]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ReportType {
    Input = 1,
    Output = 2,
    Feature = 3,
}

/// Report Reference descriptor value: `[report id, report type]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportReference {
    pub report_id: u8,
    pub report_type: ReportType,
}

impl ReportReference {
    pub fn input(report_id: u8) -> Self {
        ReportReference {
            report_id,
            report_type: ReportType::Input,
        }
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        [self.report_id, self.report_type as u8]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ProtocolMode {
    Boot = 0,
    #[default]
    Report = 1,
}

impl TryFrom<u8> for ProtocolMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ProtocolMode::Boot),
            1 => Ok(ProtocolMode::Report),
            other => Err(other),
        }
    }
}
