//! Constellation mapping, hard decisions and max-log soft demapping
//!
//! Code bits are NRZ values (`+1` for 0, `-1` for 1, or soft values of the
//! same sign convention). Bit `i` of a point index is set when the `i`-th
//! code bit is negative.

use crate::SOFT_MAX;
use rustfft::num_complex::Complex32;
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Qpsk,
    Psk8,
    Qam16,
    Qam64,
}

const MAX_POINTS: usize = 64;

fn nrz_bit(v: usize, i: usize) -> f32 {
    if (v >> i) & 1 == 1 {
        -1.0
    } else {
        1.0
    }
}

impl Modulation {
    pub fn from_bits(bits: usize) -> Option<Self> {
        match bits {
            2 => Some(Modulation::Qpsk),
            3 => Some(Modulation::Psk8),
            4 => Some(Modulation::Qam16),
            6 => Some(Modulation::Qam64),
            _ => None,
        }
    }

    pub fn bits(&self) -> usize {
        match self {
            Modulation::Qpsk => 2,
            Modulation::Psk8 => 3,
            Modulation::Qam16 => 4,
            Modulation::Qam64 => 6,
        }
    }

    pub fn order(&self) -> usize {
        1 << self.bits()
    }

    /// Minimum Euclidean distance between constellation points
    pub fn distance(&self) -> f32 {
        match self {
            Modulation::Qpsk => 2f32.sqrt(),
            Modulation::Psk8 => 2.0 * (PI / 8.0).sin(),
            Modulation::Qam16 => 2.0 / 10f32.sqrt(),
            Modulation::Qam64 => 2.0 / 42f32.sqrt(),
        }
    }

    /// Constellation point of index `v`, unit average power
    pub fn point(&self, v: usize) -> Complex32 {
        let b = |i| nrz_bit(v, i);
        match self {
            Modulation::Qpsk => Complex32::new(b(0), b(1)) / 2f32.sqrt(),
            Modulation::Psk8 => {
                let k = v ^ (v >> 1) ^ (v >> 2);
                Complex32::from_polar(1.0, (2 * k + 1) as f32 * PI / 8.0)
            }
            Modulation::Qam16 => {
                Complex32::new(b(0) * (2.0 + b(1)), b(2) * (2.0 + b(3))) / 10f32.sqrt()
            }
            Modulation::Qam64 => {
                Complex32::new(
                    b(0) * (4.0 + b(1) * (2.0 + b(2))),
                    b(3) * (4.0 + b(4) * (2.0 + b(5))),
                ) / 42f32.sqrt()
            }
        }
    }

    /// Map `bits()` NRZ code bits to a point
    pub fn map(&self, code: &[i8]) -> Complex32 {
        let v = code[..self.bits()]
            .iter()
            .enumerate()
            .fold(0, |v, (i, &c)| v | (((c < 0) as usize) << i));
        self.point(v)
    }

    /// Index of the nearest point
    pub fn hard_index(&self, c: Complex32) -> usize {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for v in 0..self.order() {
            let d = (c - self.point(v)).norm_sqr();
            if d < best_dist {
                best_dist = d;
                best = v;
            }
        }
        best
    }

    /// Nearest point
    pub fn hard(&self, c: Complex32) -> Complex32 {
        self.point(self.hard_index(c))
    }

    /// Max-log soft bits scaled by `precision`, written to `out[..bits()]`
    pub fn soft(&self, c: Complex32, precision: f32, out: &mut [i8]) {
        let order = self.order();
        let mut dist = [0f32; MAX_POINTS];
        for (v, d) in dist.iter_mut().enumerate().take(order) {
            *d = (c - self.point(v)).norm_sqr();
        }
        for (i, o) in out.iter_mut().enumerate().take(self.bits()) {
            let mut d0 = f32::INFINITY;
            let mut d1 = f32::INFINITY;
            for (v, &d) in dist.iter().enumerate().take(order) {
                if (v >> i) & 1 == 1 {
                    d1 = d1.min(d);
                } else {
                    d0 = d0.min(d);
                }
            }
            *o = quantize((d1 - d0) * precision / 2.0);
        }
    }
}

/// Minimum distance for an optional scheme; symbols without one use 2.0
pub fn distance_or_default(modulation: Option<Modulation>) -> f32 {
    modulation.map_or(2.0, |m| m.distance())
}

/// Round and clamp a soft value into the i8 range
pub fn quantize(v: f32) -> i8 {
    let max = SOFT_MAX as f32;
    v.round().clamp(-max, max) as i8
}
