//! Systematic BCH(255,71) encoder protecting the header

use crate::HEADER_BITS;

pub const BCH_LEN: usize = 255;
pub const BCH_PARITY: usize = BCH_LEN - HEADER_BITS; // 184

/// Minimal polynomials whose product is the generator
const MINIMAL_POLYS: [u16; 24] = [
    0b100011101, 0b101110111, 0b111110011, 0b101101001,
    0b110111101, 0b111100111, 0b100101011, 0b111010111,
    0b000010011, 0b101100101, 0b110001011, 0b101100011,
    0b100011011, 0b100111111, 0b110001101, 0b100101101,
    0b101011111, 0b111111001, 0b111000011, 0b100111001,
    0b110101001, 0b000011111, 0b110000111, 0b110110001,
];

#[derive(Debug, Clone)]
pub struct BchEncoder {
    // generator coefficients below the leading term, highest degree first
    taps: Vec<u8>,
}

impl BchEncoder {
    pub fn new() -> Self {
        let mut gen = vec![1u8];
        for &poly in &MINIMAL_POLYS {
            let degree = 15 - poly.leading_zeros() as usize;
            let mut prod = vec![0u8; gen.len() + degree];
            for (i, &g) in gen.iter().enumerate() {
                if g == 0 {
                    continue;
                }
                for k in 0..=degree {
                    prod[i + k] ^= ((poly >> k) & 1) as u8;
                }
            }
            gen = prod;
        }
        debug_assert_eq!(gen.len(), BCH_PARITY + 1);
        let taps = (0..BCH_PARITY).map(|j| gen[BCH_PARITY - 1 - j]).collect();
        Self { taps }
    }

    /// Parity bits for up to 71 data bits (0/1), MSB first
    pub fn parity(&self, data: &[u8]) -> Vec<u8> {
        let mut par = vec![0u8; BCH_PARITY];
        for &d in data {
            let fb = (d ^ par[0]) & 1;
            par.copy_within(1.., 0);
            par[BCH_PARITY - 1] = 0;
            if fb == 1 {
                for (p, &t) in par.iter_mut().zip(&self.taps) {
                    *p ^= t;
                }
            }
        }
        par
    }

    /// Full codeword: data followed by parity
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut code = data.to_vec();
        code.extend(self.parity(data));
        code
    }

    /// Rows `[e_i | parity(e_i)]` spanning the code
    pub fn generator_matrix(&self) -> Vec<Vec<u8>> {
        (0..HEADER_BITS)
            .map(|i| {
                let mut unit = vec![0u8; HEADER_BITS];
                unit[i] = 1;
                self.encode(&unit)
            })
            .collect()
    }

    /// True when `code` is divisible by the generator
    pub fn is_codeword(&self, code: &[u8]) -> bool {
        let mut rem = vec![0u8; BCH_PARITY];
        for &c in code {
            let fb = rem[0];
            rem.copy_within(1.., 0);
            rem[BCH_PARITY - 1] = c & 1;
            if fb == 1 {
                for (r, &t) in rem.iter_mut().zip(&self.taps) {
                    *r ^= t;
                }
            }
        }
        rem.iter().all(|&r| r == 0)
    }
}

impl Default for BchEncoder {
    fn default() -> Self {
        Self::new()
    }
}
