//! LSB-first bit packing used by HID reports. Field bit 0 lands in the lowest
//! free bit of the current byte and fields may straddle byte boundaries.

#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter::default()
    }

    /// Writes the low `bits` bits of `value` (1..=32).
    pub fn write(&mut self, value: u32, bits: u8) -> &mut Self {
        debug_assert!((1..=32).contains(&bits));
        for bit in 0..bits {
            let byte = self.bit_len / 8;
            if byte == self.bytes.len() {
                self.bytes.push(0);
            }
            if (value >> bit) & 1 == 1 {
                self.bytes[byte] |= 1 << (self.bit_len % 8);
            }
            self.bit_len += 1;
        }
        self
    }

    /// Two's complement truncated to `bits`.
    pub fn write_signed(&mut self, value: i32, bits: u8) -> &mut Self {
        self.write(value as u32, bits)
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write(u32::from(value), 1)
    }

    /// Constant padding bits, always zero.
    pub fn pad(&mut self, bits: u8) -> &mut Self {
        self.write(0, bits)
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn finish(&mut self) -> Vec<u8> {
        self.bit_len = 0;
        std::mem::take(&mut self.bytes)
    }
}

#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader { data, position: 0 }
    }

    pub fn at(data: &'a [u8], position: usize) -> Self {
        BitReader { data, position }
    }

    pub fn read(&mut self, bits: u8) -> Option<u32> {
        if bits == 0 || bits > 32 || self.position + usize::from(bits) > self.data.len() * 8 {
            return None;
        }
        let mut value = 0u32;
        for bit in 0..bits {
            let byte = self.data[self.position / 8];
            if (byte >> (self.position % 8)) & 1 == 1 {
                value |= 1 << bit;
            }
            self.position += 1;
        }
        Some(value)
    }

    /// Sign-extends a `bits` wide field.
    pub fn read_signed(&mut self, bits: u8) -> Option<i32> {
        let raw = self.read(bits)?;
        if bits == 32 {
            return Some(raw as i32);
        }
        let shift = 32 - u32::from(bits);
        Some(((raw << shift) as i32) >> shift)
    }

    pub fn read_bool(&mut self) -> Option<bool> {
        self.read(1).map(|bit| bit == 1)
    }

    pub fn skip(&mut self, bits: usize) -> Option<()> {
        if self.position + bits > self.data.len() * 8 {
            return None;
        }
        self.position += bits;
        Some(())
    }

    pub fn position(&self) -> usize {
        self.position
    }
}
