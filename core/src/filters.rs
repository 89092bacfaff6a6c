//! Receive front end: DC blocker, Hilbert transformer and the running sums
//! used by the correlator

use rustfft::num_complex::Complex32;
use std::f32::consts::PI;
use std::ops::{Add, Sub};

/// First-order DC blocking filter `y = x - x1 + a*y1`
#[derive(Debug, Clone)]
pub struct BlockDc {
    a: f32,
    x1: f32,
    y1: f32,
}

impl BlockDc {
    pub fn new(len: usize) -> Self {
        Self {
            a: 1.0 - 1.0 / len as f32,
            x1: 0.0,
            y1: 0.0,
        }
    }

    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.a * self.y1;
        self.x1 = x;
        self.y1 = y;
        y
    }
}

/// Blackman windowed FIR Hilbert transformer
///
/// Turns a real stream into an analytic one. The real part is the input
/// delayed by the filter's group delay of `(taps - 1) / 2` samples.
#[derive(Debug, Clone)]
pub struct Hilbert {
    taps: Vec<f32>,
    hist: Vec<f32>,
    center: usize,
}

impl Hilbert {
    pub fn new(len: usize) -> Self {
        let center = (len - 1) / 2;
        let width = (center + 1) as f32;
        let taps = (0..len)
            .map(|k| {
                let n = k as i32 - center as i32;
                if n % 2 == 0 {
                    return 0.0;
                }
                let x = n as f32;
                let window =
                    0.42 + 0.5 * (PI * x / width).cos() + 0.08 * (2.0 * PI * x / width).cos();
                2.0 / (PI * x) * window
            })
            .collect();
        Self {
            taps,
            hist: vec![0.0; len],
            center,
        }
    }

    pub fn delay(&self) -> usize {
        self.center
    }

    pub fn process(&mut self, x: f32) -> Complex32 {
        let len = self.hist.len();
        self.hist.copy_within(1.., 0);
        self.hist[len - 1] = x;
        let im = self
            .taps
            .iter()
            .zip(self.hist.iter().rev())
            .map(|(h, s)| h * s)
            .sum();
        Complex32::new(self.hist[len - 1 - self.center], im)
    }
}

/// Sum over the last `len` inputs
///
/// The sum is rebuilt from the window every time the write position wraps so
/// rounding errors cannot pile up over long streams.
#[derive(Debug, Clone)]
pub struct MovingSum<T> {
    buf: Vec<T>,
    pos: usize,
    sum: T,
}

impl<T> MovingSum<T>
where
    T: Copy + Default + Add<Output = T> + Sub<Output = T>,
{
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![T::default(); len],
            pos: 0,
            sum: T::default(),
        }
    }

    pub fn process(&mut self, x: T) -> T {
        self.sum = self.sum + x - self.buf[self.pos];
        self.buf[self.pos] = x;
        self.pos += 1;
        if self.pos == self.buf.len() {
            self.pos = 0;
            self.sum = self.buf.iter().fold(T::default(), |acc, &v| acc + v);
        }
        self.sum
    }

    pub fn sum(&self) -> T {
        self.sum
    }
}

/// Fixed delay line; a zero length delay passes samples straight through
#[derive(Debug, Clone)]
pub struct Delay<T> {
    buf: Vec<T>,
    pos: usize,
}

impl<T: Copy + Default> Delay<T> {
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![T::default(); len],
            pos: 0,
        }
    }

    pub fn process(&mut self, x: T) -> T {
        if self.buf.is_empty() {
            return x;
        }
        let y = std::mem::replace(&mut self.buf[self.pos], x);
        self.pos = (self.pos + 1) % self.buf.len();
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_dc_removes_offset() {
        let mut dc = BlockDc::new(21);
        let mut y = 0.0;
        for _ in 0..2000 {
            y = dc.process(0.5);
        }
        assert!(y.abs() < 1e-3, "residual {}", y);
    }

    #[test]
    fn test_hilbert_quadrature() {
        // a tone at a quarter of the sample rate comes out as e^{j*w*n}
        let mut hilbert = Hilbert::new(21);
        let w = PI / 2.0;
        let mut out = Vec::new();
        for n in 0..200 {
            out.push(hilbert.process((w * n as f32).cos()));
        }
        for c in &out[50..] {
            assert!((c.norm() - 1.0).abs() < 0.05, "magnitude {}", c.norm());
        }
        // consecutive samples advance by +90 degrees
        let rot = out[101] * out[100].conj();
        assert!((rot.arg() - w).abs() < 0.05);
    }

    #[test]
    fn test_hilbert_delay() {
        let mut hilbert = Hilbert::new(21);
        assert_eq!(hilbert.delay(), 10);
        let mut out = Vec::new();
        for n in 0..30 {
            out.push(hilbert.process(if n == 0 { 1.0 } else { 0.0 }).re);
        }
        assert_eq!(out[10], 1.0);
        assert_eq!(out.iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn test_moving_sum() {
        let mut sum = MovingSum::<f32>::new(3);
        assert_eq!(sum.process(1.0), 1.0);
        assert_eq!(sum.process(2.0), 3.0);
        assert_eq!(sum.process(3.0), 6.0);
        assert_eq!(sum.process(4.0), 9.0);
        assert_eq!(sum.sum(), 9.0);
    }

    #[test]
    fn test_delay() {
        let mut d = Delay::<f32>::new(2);
        assert_eq!(d.process(1.0), 0.0);
        assert_eq!(d.process(2.0), 0.0);
        assert_eq!(d.process(3.0), 1.0);
        let mut through = Delay::<f32>::new(0);
        assert_eq!(through.process(7.0), 7.0);
    }
}
