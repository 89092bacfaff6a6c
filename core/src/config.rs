use crate::error::{ModemError, Result};
use crate::modulation::Modulation;
use crate::PAYLOAD_CRC_BITS;

/// One row of the operating mode table
///
/// `oper_mode` is carried in the low byte of the header. Mode 0 is a
/// beacon with no payload; every other mode describes how a packet is laid
/// out over `rows` OFDM symbols of `code_cols + comb_cols` tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemConfig {
    pub oper_mode: u8,
    pub band_width: u32,
    pub mod_bits: usize,
    pub rows: usize,
    pub comb_cols: usize,
    pub code_order: u32,
    pub code_cols: usize,
    pub reserved_tones: usize,
}

const fn mode(
    oper_mode: u8,
    band_width: u32,
    mod_bits: usize,
    rows: usize,
    comb_cols: usize,
    code_order: u32,
    code_cols: usize,
    reserved_tones: usize,
) -> ModemConfig {
    ModemConfig {
        oper_mode,
        band_width,
        mod_bits,
        rows,
        comb_cols,
        code_order,
        code_cols,
        reserved_tones,
    }
}

pub const MODES: [ModemConfig; 12] = [
    mode(0, 1600, 0, 0, 0, 0, 256, 0),
    mode(20, 1600, 2, 2, 0, 10, 256, 0),
    mode(21, 1600, 2, 4, 0, 11, 256, 0),
    mode(22, 1600, 3, 3, 0, 12, 256, 0),
    mode(23, 1600, 2, 8, 0, 12, 256, 0),
    mode(24, 1600, 3, 10, 0, 13, 256, 0),
    mode(25, 1600, 2, 32, 0, 14, 256, 0),
    mode(26, 1700, 4, 4, 8, 12, 256, 8),
    mode(27, 1700, 4, 8, 8, 13, 256, 8),
    mode(28, 1700, 4, 16, 8, 14, 256, 8),
    mode(29, 1900, 6, 5, 16, 13, 273, 15),
    mode(30, 1900, 6, 10, 16, 14, 273, 15),
];

impl ModemConfig {
    /// Find the table row for an operating mode
    pub fn lookup(oper_mode: u8) -> Result<&'static ModemConfig> {
        MODES
            .iter()
            .find(|m| m.oper_mode == oper_mode)
            .ok_or(ModemError::UnsupportedMode(oper_mode))
    }

    pub fn has_payload(&self) -> bool {
        self.rows > 0
    }

    /// Tones per data symbol, pilots included
    pub fn cols(&self) -> usize {
        self.code_cols + self.comb_cols
    }

    pub fn is_comb(&self) -> bool {
        self.comb_cols > 0
    }

    pub fn comb_dist(&self) -> usize {
        if self.is_comb() {
            self.cols() / self.comb_cols
        } else {
            1
        }
    }

    pub fn comb_off(&self) -> usize {
        if self.is_comb() {
            self.comb_dist() / 2
        } else {
            1
        }
    }

    /// True when column `col` carries a comb pilot rather than data
    pub fn is_pilot(&self, col: usize) -> bool {
        self.is_comb() && col % self.comb_dist() == self.comb_off()
    }

    pub fn modulation(&self) -> Option<Modulation> {
        Modulation::from_bits(self.mod_bits)
    }

    /// Polar code length
    pub fn code_len(&self) -> usize {
        if self.has_payload() {
            1 << self.code_order
        } else {
            0
        }
    }

    pub fn data_bits(&self) -> usize {
        if self.has_payload() {
            1 << (self.code_order - 1)
        } else {
            0
        }
    }

    /// Message bits handed to the polar encoder: data plus CRC
    pub fn message_bits(&self) -> usize {
        if self.has_payload() {
            self.data_bits() + PAYLOAD_CRC_BITS
        } else {
            0
        }
    }

    /// Largest payload `data_packet` accepts, which is also what the decoder returns
    pub fn max_packet_len(&self) -> usize {
        if self.has_payload() {
            1 << (self.code_order - 4)
        } else {
            0
        }
    }

    /// Code bits that actually go on the air; the rest of the codeword is punctured
    pub fn transmitted_bits(&self) -> usize {
        self.rows * self.code_cols * self.mod_bits
    }

    /// `(parity_stride, first_parity)` of the parity-aided polar code
    pub fn parity_params(&self) -> (usize, usize) {
        match self.code_order {
            13 => (31, 5),
            14 => (31, 9),
            _ => (31, 3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CODE_ORDER_MAX, CODE_ORDER_MIN};

    #[test]
    fn test_modes_unique() {
        for (i, a) in MODES.iter().enumerate() {
            for b in &MODES[i + 1..] {
                assert_ne!(a.oper_mode, b.oper_mode);
            }
        }
    }

    #[test]
    fn test_lookup() {
        let m = ModemConfig::lookup(23).unwrap();
        assert_eq!(m.mod_bits, 2);
        assert_eq!(m.rows, 8);
        assert_eq!(m.code_order, 12);
        assert_eq!(m.max_packet_len(), 256);

        assert!(!ModemConfig::lookup(0).unwrap().has_payload());
        assert!(matches!(ModemConfig::lookup(19), Err(ModemError::UnsupportedMode(19))));
        assert!(matches!(ModemConfig::lookup(31), Err(ModemError::UnsupportedMode(31))));
    }

    #[test]
    fn test_payload_modes_fit_code() {
        for m in MODES.iter().filter(|m| m.has_payload()) {
            assert!(m.code_order >= CODE_ORDER_MIN && m.code_order <= CODE_ORDER_MAX);
            assert!(m.transmitted_bits() <= m.code_len(), "mode {}", m.oper_mode);
            assert!(m.transmitted_bits() > m.message_bits(), "mode {}", m.oper_mode);
            assert!(m.modulation().is_some());
            assert_eq!(m.max_packet_len() * 8, m.data_bits());
        }
    }

    #[test]
    fn test_comb_layout() {
        for m in MODES.iter().filter(|m| m.has_payload()) {
            let pilots = (0..m.cols()).filter(|&i| m.is_pilot(i)).count();
            assert_eq!(pilots, m.comb_cols, "mode {}", m.oper_mode);
            assert_eq!(m.is_comb(), m.reserved_tones > 0);
        }
    }
}
