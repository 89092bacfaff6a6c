use crate::error::{ModemError, Result};
use crate::{BASE_SAMPLE_RATE, BASE_SYMBOL_LEN};
use rustfft::{num_complex::Complex32, Fft, FftPlanner};
use std::sync::Arc;

/// Symbol and filter sizes derived from the sample rate
///
/// At 8 kHz a symbol is 1280 samples (6.25 Hz tone spacing) with a 160 sample
/// guard interval. Everything scales linearly with the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub sample_rate: u32,
    pub symbol_len: usize,
    pub guard_len: usize,
    pub extended_len: usize,
    pub filter_len: usize,
    pub buffer_len: usize,
    pub search_pos: usize,
}

impl Geometry {
    pub fn new(sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 || sample_rate % BASE_SAMPLE_RATE != 0 {
            return Err(ModemError::InvalidConfig(format!(
                "sample rate {} is not a multiple of {}",
                sample_rate, BASE_SAMPLE_RATE
            )));
        }
        let factor = (sample_rate / BASE_SAMPLE_RATE) as usize;
        let symbol_len = BASE_SYMBOL_LEN * factor;
        let guard_len = symbol_len / 8;
        let extended_len = symbol_len + guard_len;
        let filter_len = ((21 * factor) & !3) | 1;
        Ok(Self {
            sample_rate,
            symbol_len,
            guard_len,
            extended_len,
            filter_len,
            buffer_len: 4 * extended_len,
            search_pos: extended_len,
        })
    }

    /// Map a signed carrier index to an FFT bin
    pub fn bin(&self, carrier: isize) -> usize {
        carrier.rem_euclid(self.symbol_len as isize) as usize
    }

    /// Carrier index of a frequency in Hz
    pub fn carrier_index(&self, freq_hz: i32) -> isize {
        (freq_hz as i64 * self.symbol_len as i64 / self.sample_rate as i64) as isize
    }

    pub fn tone_spacing(&self) -> f32 {
        self.sample_rate as f32 / self.symbol_len as f32
    }
}

/// Unnormalized forward/inverse FFT pair of a fixed size
pub struct Ofdm {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex32>,
}

impl Ofdm {
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            forward,
            inverse,
            scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn forward(&mut self, buf: &mut [Complex32]) {
        self.forward.process_with_scratch(buf, &mut self.scratch);
    }

    pub fn inverse(&mut self, buf: &mut [Complex32]) {
        self.inverse.process_with_scratch(buf, &mut self.scratch);
    }
}

pub fn nrz(bit: bool) -> f32 {
    if bit {
        -1.0
    } else {
        1.0
    }
}

/// Differential demodulation of `cur` against `prev`
///
/// Returns zero (an erasure) when the reference has no power or the ratio is
/// implausibly large.
pub fn demod_or_erase(cur: Complex32, prev: Complex32) -> Complex32 {
    let zero = Complex32::new(0.0, 0.0);
    if !(prev.norm_sqr() > 0.0) {
        return zero;
    }
    let cons = cur / prev;
    if !(cons.norm_sqr() <= 4.0) {
        return zero;
    }
    cons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_8k() {
        let g = Geometry::new(8000).unwrap();
        assert_eq!(g.symbol_len, 1280);
        assert_eq!(g.guard_len, 160);
        assert_eq!(g.extended_len, 1440);
        assert_eq!(g.filter_len, 21);
        assert_eq!(g.buffer_len, 5760);
        assert_eq!(g.carrier_index(1500), 240);
        assert!((g.tone_spacing() - 6.25).abs() < 1e-6);
    }

    #[test]
    fn test_geometry_scaled() {
        let g = Geometry::new(48000).unwrap();
        assert_eq!(g.symbol_len, 7680);
        assert_eq!(g.guard_len, 960);
        assert_eq!(g.filter_len, 125);
        assert_eq!(Geometry::new(16000).unwrap().filter_len, 41);
        assert!(Geometry::new(44100).is_err());
        assert!(Geometry::new(0).is_err());
    }

    #[test]
    fn test_bin_wraps() {
        let g = Geometry::new(8000).unwrap();
        assert_eq!(g.bin(0), 0);
        assert_eq!(g.bin(-1), 1279);
        assert_eq!(g.bin(1280 + 5), 5);
    }

    #[test]
    fn test_forward_inverse() {
        let mut ofdm = Ofdm::new(64);
        let orig: Vec<Complex32> = (0..64)
            .map(|i| Complex32::new((i as f32 * 0.3).sin(), (i as f32 * 0.7).cos()))
            .collect();
        let mut buf = orig.clone();
        ofdm.forward(&mut buf);
        ofdm.inverse(&mut buf);
        for (a, b) in orig.iter().zip(&buf) {
            assert!((a * 64.0 - b).norm() < 1e-3);
        }
    }

    #[test]
    fn test_demod_or_erase() {
        let one = Complex32::new(1.0, 0.0);
        let zero = Complex32::new(0.0, 0.0);
        assert_eq!(demod_or_erase(one, zero), zero);
        assert_eq!(demod_or_erase(Complex32::new(3.0, 0.0), one), zero);
        let c = demod_or_erase(Complex32::new(0.0, 2.0), Complex32::new(2.0, 0.0));
        assert!((c - Complex32::new(0.0, 1.0)).norm() < 1e-6);
    }
}
