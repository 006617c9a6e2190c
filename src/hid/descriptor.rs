//! HID report descriptor parser.
//!
//! Walks the short items of a report descriptor and records, per report id
//! and direction, the fields in the order they appear in the report together
//! with their bit offset. The layouts are used to check the fixed report
//! encoders against the report maps the peripheral serves.
//!
//! Limitations: long items and Push/Pop are rejected, delimiters are ignored
//! and nested collections are flattened.

use std::collections::BTreeMap;

use crate::{Error, ErrorType};

use super::bits::BitReader;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportKind {
    Input,
    Output,
    Feature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsagePage {
    /// Generic Desktop (mouse, keyboard, pointer).
    GenericDesktop,
    /// Keyboard/Keypad.
    Keyboard,
    Led,
    Button,
    Digitizer,
    Consumer,
    Unknown(u16),
}

impl From<u16> for UsagePage {
    fn from(code: u16) -> Self {
        match code {
            0x01 => UsagePage::GenericDesktop,
            0x07 => UsagePage::Keyboard,
            0x08 => UsagePage::Led,
            0x09 => UsagePage::Button,
            0x0D => UsagePage::Digitizer,
            0x0C => UsagePage::Consumer,
            other => UsagePage::Unknown(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportField {
    pub usage_page: UsagePage,
    /// Usages declared for the field; a usage range is kept as its bounds.
    pub usages: Vec<u16>,
    pub bit_offset: usize,
    pub size: u32,
    pub count: u32,
    pub constant: bool,
    pub variable: bool,
    pub relative: bool,
    pub logical_min: i32,
    pub logical_max: i32,
}

impl ReportField {
    pub fn bit_len(&self) -> usize {
        (self.size * self.count) as usize
    }

    pub fn is_signed(&self) -> bool {
        self.logical_min < 0
    }

    /// Value of element `index` of this field inside `report`, which must not
    /// include the report id byte.
    pub fn read(&self, report: &[u8], index: u32) -> Option<i32> {
        if index >= self.count || self.size == 0 || self.size > 32 {
            return None;
        }
        let position = self.bit_offset + (index * self.size) as usize;
        let mut reader = BitReader::at(report, position);
        let size = self.size as u8;
        if self.is_signed() {
            reader.read_signed(size)
        } else {
            reader.read(size).map(|value| value as i32)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportLayout {
    pub report_id: u8,
    pub kind: ReportKind,
    pub fields: Vec<ReportField>,
    pub bit_len: usize,
}

impl ReportLayout {
    pub fn byte_len(&self) -> usize {
        self.bit_len.div_ceil(8)
    }

    /// Every element of every data (non-constant) field, in report order.
    pub fn values(&self, report: &[u8]) -> Option<Vec<i32>> {
        let mut values = Vec::new();
        for field in self.fields.iter().filter(|field| !field.constant) {
            for index in 0..field.count {
                values.push(field.read(report, index)?);
            }
        }
        Some(values)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportDescriptor {
    reports: BTreeMap<(u8, ReportKind), ReportLayout>,
    uses_report_ids: bool,
}

#[derive(Default)]
struct GlobalState {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    report_size: u32,
    report_count: u32,
    report_id: u8,
}

#[derive(Default)]
struct LocalState {
    usages: Vec<u16>,
    usage_min: Option<u16>,
    usage_max: Option<u16>,
}

impl LocalState {
    fn take_usages(&mut self) -> Vec<u16> {
        let mut usages = std::mem::take(&mut self.usages);
        if let (Some(min), Some(max)) = (self.usage_min, self.usage_max) {
            usages.push(min);
            usages.push(max);
        }
        *self = LocalState::default();
        usages
    }
}

impl ReportDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut descriptor = ReportDescriptor::default();
        let mut global = GlobalState::default();
        let mut local = LocalState::default();
        let mut depth: usize = 0;

        let mut i = 0;
        while i < data.len() {
            let prefix = data[i];
            if prefix == 0xFE {
                return Err(invalid(i, "long items are not supported"));
            }
            let tag = (prefix >> 4) & 0x0F;
            let item_type = (prefix >> 2) & 0x03;
            let size = match prefix & 0x03 {
                0 => 0,
                1 => 1,
                2 => 2,
                _ => 4,
            };
            if i + 1 + size > data.len() {
                return Err(invalid(i, "item runs past the end"));
            }
            let bytes = &data[i + 1..i + 1 + size];
            let unsigned: u32 = match size {
                0 => 0,
                1 => bytes[0] as u32,
                2 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
                _ => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            };
            let signed: i32 = match size {
                0 => 0,
                1 => bytes[0] as i8 as i32,
                2 => i16::from_le_bytes([bytes[0], bytes[1]]) as i32,
                _ => unsigned as i32,
            };

            match item_type {
                // Main items
                0 => match tag {
                    0x08 | 0x09 | 0x0B => {
                        let kind = match tag {
                            0x08 => ReportKind::Input,
                            0x09 => ReportKind::Output,
                            _ => ReportKind::Feature,
                        };
                        descriptor.add_field(kind, &global, local.take_usages(), unsigned);
                    }
                    // Collection
                    0x0A => {
                        depth += 1;
                        local = LocalState::default();
                    }
                    // End Collection
                    0x0C => {
                        depth = depth
                            .checked_sub(1)
                            .ok_or_else(|| invalid(i, "end collection without collection"))?;
                        local = LocalState::default();
                    }
                    _ => {}
                },
                // Global items
                1 => match tag {
                    0x00 => global.usage_page = unsigned as u16,
                    0x01 => global.logical_min = signed,
                    0x02 => global.logical_max = signed,
                    0x07 => global.report_size = unsigned,
                    0x08 => {
                        if unsigned == 0 || unsigned > 0xFF {
                            return Err(invalid(i, "report id must be 1..=255"));
                        }
                        global.report_id = unsigned as u8;
                        descriptor.uses_report_ids = true;
                    }
                    0x09 => global.report_count = unsigned,
                    0x0A | 0x0B => return Err(invalid(i, "push/pop are not supported")),
                    // Physical range, unit and exponent do not affect layout.
                    _ => {}
                },
                // Local items
                2 => match tag {
                    0x00 => local.usages.push(unsigned as u16),
                    0x01 => local.usage_min = Some(unsigned as u16),
                    0x02 => local.usage_max = Some(unsigned as u16),
                    _ => {}
                },
                _ => {}
            }

            i += 1 + size;
        }

        if depth != 0 {
            return Err(invalid(data.len(), "unterminated collection"));
        }
        Ok(descriptor)
    }

    fn add_field(&mut self, kind: ReportKind, global: &GlobalState, usages: Vec<u16>, flags: u32) {
        let layout = self
            .reports
            .entry((global.report_id, kind))
            .or_insert_with(|| ReportLayout {
                report_id: global.report_id,
                kind,
                fields: Vec::new(),
                bit_len: 0,
            });
        let field = ReportField {
            usage_page: UsagePage::from(global.usage_page),
            usages,
            bit_offset: layout.bit_len,
            size: global.report_size,
            count: global.report_count,
            constant: flags & 0x01 != 0,
            variable: flags & 0x02 != 0,
            relative: flags & 0x04 != 0,
            logical_min: global.logical_min,
            logical_max: global.logical_max,
        };
        layout.bit_len += field.bit_len();
        layout.fields.push(field);
    }

    pub fn uses_report_ids(&self) -> bool {
        self.uses_report_ids
    }

    pub fn report(&self, report_id: u8, kind: ReportKind) -> Option<&ReportLayout> {
        self.reports.get(&(report_id, kind))
    }

    pub fn reports(&self) -> impl Iterator<Item = &ReportLayout> {
        self.reports.values()
    }

    /// Payload bits of an input report, excluding the report id byte.
    pub fn input_bits(&self, report_id: u8) -> Option<usize> {
        self.report(report_id, ReportKind::Input)
            .map(|layout| layout.bit_len)
    }
}

fn invalid(offset: usize, reason: &str) -> Error {
    Error::new(
        "ReportDescriptor",
        format!("byte {offset}: {reason}"),
        ErrorType::HidDescriptor,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_truncated_items() {
        assert!(ReportDescriptor::parse(&[0x05]).is_err());
        assert!(ReportDescriptor::parse(&[0xa1, 0x01]).is_err());
        assert!(ReportDescriptor::parse(&[0xc0]).is_err());
    }

    #[test]
    fn sign_extends_logical_minimum() {
        let data = [
            0x85, 0x03, // Report ID (3)
            0x16, 0x01, 0x80, // Logical Minimum (-32767)
            0x26, 0xff, 0x7f, // Logical Maximum (32767)
            0x75, 0x10, // Report Size (16)
            0x95, 0x01, // Report Count (1)
            0x81, 0x02, // Input (Data, Variable, Absolute)
        ];
        let descriptor = ReportDescriptor::parse(&data).unwrap();
        let layout = descriptor.report(3, ReportKind::Input).unwrap();
        assert_eq!(layout.fields[0].logical_min, -32767);
        assert_eq!(layout.fields[0].logical_max, 32767);
        assert_eq!(layout.values(&[0x00, 0x80]).unwrap(), vec![-32768]);
        assert!(descriptor.uses_report_ids());
    }
}
