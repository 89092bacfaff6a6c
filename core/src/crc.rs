/// Bitwise reflected CRC with zero initial value
///
/// The width is implied by the polynomial: 0xA8F4 gives the 16-bit header
/// check and 0x8F6E37A0 the 32-bit payload check. Bytes are fed LSB first.
#[derive(Debug, Clone)]
pub struct Crc {
    poly: u32,
    crc: u32,
}

impl Crc {
    pub fn new(poly: u32) -> Self {
        Self { poly, crc: 0 }
    }

    pub fn reset(&mut self) {
        self.crc = 0;
    }

    pub fn value(&self) -> u32 {
        self.crc
    }

    pub fn bit(&mut self, bit: bool) -> u32 {
        let tmp = self.crc ^ bit as u32;
        self.crc = (self.crc >> 1) ^ (self.poly & 0u32.wrapping_sub(tmp & 1));
        self.crc
    }

    pub fn byte(&mut self, byte: u8) -> u32 {
        for i in 0..8 {
            self.bit((byte >> i) & 1 == 1);
        }
        self.crc
    }

    pub fn bytes(&mut self, data: &[u8]) -> u32 {
        for &b in data {
            self.byte(b);
        }
        self.crc
    }

    /// Feed a 64-bit word as eight little-endian bytes
    pub fn word(&mut self, word: u64) -> u32 {
        self.bytes(&word.to_le_bytes())
    }
}
