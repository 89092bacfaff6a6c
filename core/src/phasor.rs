use rustfft::num_complex::Complex32;
use std::f64::consts::TAU;

/// Complex oscillator used to remove the carrier frequency offset
///
/// Phase is accumulated in f64 and wrapped each step.
#[derive(Debug, Clone, Default)]
pub struct Phasor {
    phase: f64,
    omega: f64,
}

impl Phasor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frequency in radians per sample and restart at zero phase
    pub fn start(&mut self, omega: f32) {
        self.omega = omega as f64;
        self.phase = 0.0;
    }

    pub fn next_value(&mut self) -> Complex32 {
        let v = Complex32::from_polar(1.0, self.phase as f32);
        self.advance(1);
        v
    }

    /// Skip `n` samples without producing output
    pub fn advance(&mut self, n: usize) {
        self.phase = (self.phase + self.omega * n as f64).rem_euclid(TAU);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation() {
        let mut osc = Phasor::new();
        osc.start(std::f32::consts::FRAC_PI_2);
        let a = osc.next_value();
        let b = osc.next_value();
        assert!((a - Complex32::new(1.0, 0.0)).norm() < 1e-6);
        assert!((b - Complex32::new(0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn test_advance_matches_stepping() {
        let mut a = Phasor::new();
        let mut b = Phasor::new();
        a.start(-0.37);
        b.start(-0.37);
        for _ in 0..1000 {
            a.next_value();
        }
        b.advance(1000);
        assert!((a.next_value() - b.next_value()).norm() < 1e-4);
    }
}
