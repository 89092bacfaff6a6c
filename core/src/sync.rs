use crate::filters::{Delay, MovingSum};
use crate::mls::Mls;
use crate::ofdm::{demod_or_erase, nrz, Geometry, Ofdm};
use crate::{MLS0_LEN, MLS0_POLY};
use log::{debug, trace};
use rustfft::num_complex::Complex32;
use std::f32::consts::{PI, TAU};

/// Window of the most recent analytic samples, oldest first
///
/// Every sample is stored twice so the window is always one contiguous slice.
pub struct History {
    buf: Vec<Complex32>,
    pos: usize,
    len: usize,
}

impl History {
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![Complex32::new(0.0, 0.0); 2 * len],
            pos: 0,
            len,
        }
    }

    pub fn push(&mut self, x: Complex32) {
        self.buf[self.pos] = x;
        self.buf[self.pos + self.len] = x;
        self.pos = (self.pos + 1) % self.len;
    }

    pub fn window(&self) -> &[Complex32] {
        &self.buf[self.pos..self.pos + self.len]
    }
}

/// Reference for the differentially encoded MLS0 on the half-symbol grid
pub fn sync_sequence(geometry: &Geometry) -> Vec<Complex32> {
    let half = geometry.symbol_len / 2;
    let first = -((MLS0_LEN as isize - 1) / 2);
    let mut seq = vec![Complex32::new(0.0, 0.0); half];
    let mut mls = Mls::new(MLS0_POLY);
    for i in 0..MLS0_LEN as isize {
        let idx = (i + first).rem_euclid(half as isize) as usize;
        seq[idx] = Complex32::new(nrz(mls.next_bit()), 0.0);
    }
    seq
}

// ============================================================================
// SCHMIDL-COX CORRELATOR
// ============================================================================
// The sync symbol only uses even tones, so its two halves repeat. The running
// autocorrelation P between the halves, normalized by the power R, forms a
// plateau; the Schmitt trigger latches its maximum and a falling edge hands
// the candidate to the MLS0 cross-correlation that fixes timing and the
// integer part of the frequency offset.
pub struct SchmidlCox {
    half: usize,
    guard_len: usize,
    search_pos: usize,
    match_del: usize,
    cor: MovingSum<Complex32>,
    pwr: MovingSum<f32>,
    matched: MovingSum<f32>,
    delay: Delay<f32>,
    threshold_low: f32,
    threshold_high: f32,
    triggered: bool,
    collecting: bool,
    timing_max: f32,
    phase_max: f32,
    index_max: usize,
    ofdm: Ofdm,
    kern: Vec<Complex32>,
    tmp0: Vec<Complex32>,
    tmp1: Vec<Complex32>,
    symbol_pos: usize,
    cfo_rad: f32,
}

impl SchmidlCox {
    pub fn new(geometry: &Geometry) -> Self {
        let half = geometry.symbol_len / 2;
        let match_len = geometry.guard_len | 1;
        let match_del = (match_len - 1) / 2;
        let mut ofdm = Ofdm::new(half);
        let mut kern = sync_sequence(geometry);
        ofdm.forward(&mut kern);
        for k in kern.iter_mut() {
            *k = k.conj() / half as f32;
        }
        Self {
            half,
            guard_len: geometry.guard_len,
            search_pos: geometry.search_pos,
            match_del,
            cor: MovingSum::new(half),
            pwr: MovingSum::new(2 * half),
            matched: MovingSum::new(match_len),
            delay: Delay::new(match_del),
            threshold_low: 0.17 * match_len as f32,
            threshold_high: 0.19 * match_len as f32,
            triggered: false,
            collecting: false,
            timing_max: 0.0,
            phase_max: 0.0,
            index_max: 0,
            ofdm,
            kern,
            tmp0: vec![Complex32::new(0.0, 0.0); half],
            tmp1: vec![Complex32::new(0.0, 0.0); half],
            symbol_pos: 0,
            cfo_rad: 0.0,
        }
    }

    /// Start of the detected symbol within the history window
    pub fn symbol_pos(&self) -> usize {
        self.symbol_pos
    }

    /// Carrier frequency offset in radians per sample
    pub fn cfo_rad(&self) -> f32 {
        self.cfo_rad
    }

    /// Advance by one sample; `samples` is the full history window
    ///
    /// Returns true once a sync symbol has been located.
    pub fn process(&mut self, samples: &[Complex32]) -> bool {
        let half = self.half;
        let sp = self.search_pos;
        let p = self
            .cor
            .process(samples[sp + half] * samples[sp + 2 * half].conj());
        let r = (0.5 * self.pwr.process(samples[sp + 2 * half].norm_sqr()))
            .max(0.0001 * half as f32);
        let timing = self.matched.process(p.norm_sqr() / (r * r));
        let phase = self.delay.process(p.arg());

        if !self.triggered && timing > self.threshold_high {
            self.triggered = true;
        } else if self.triggered && timing < self.threshold_low {
            self.triggered = false;
        }
        let collect = self.triggered;
        let falling = self.collecting && !collect;
        self.collecting = collect;
        if !collect && !falling {
            return false;
        }

        if self.timing_max < timing {
            self.timing_max = timing;
            self.phase_max = phase;
            self.index_max = self.match_del;
        } else if self.index_max < half + self.guard_len + self.match_del {
            self.index_max += 1;
        }
        if !falling {
            return false;
        }

        let frac_cfo = self.phase_max / half as f32;
        let pos = sp - self.index_max;
        trace!(
            "correlator plateau: timing {:.3} index {}",
            self.timing_max,
            self.index_max
        );
        self.index_max = 0;
        self.timing_max = 0.0;

        for (i, t) in self.tmp0.iter_mut().enumerate() {
            *t = samples[i + pos + half] * Complex32::from_polar(1.0, frac_cfo * i as f32);
        }
        self.ofdm.forward(&mut self.tmp0);
        for i in 0..half {
            self.tmp1[i] = demod_or_erase(self.tmp0[i], self.tmp0[(i + half - 1) % half]);
        }
        self.ofdm.forward(&mut self.tmp1);
        for (t, k) in self.tmp1.iter_mut().zip(&self.kern) {
            *t *= k;
        }
        self.ofdm.inverse(&mut self.tmp1);

        let mut shift = 0;
        let mut peak = 0.0f32;
        let mut next = 0.0f32;
        for (i, v) in self.tmp1.iter().enumerate() {
            let power = v.norm_sqr();
            if power > peak {
                next = peak;
                peak = power;
                shift = i;
            } else if power > next {
                next = power;
            }
        }
        if peak <= next * 4.0 {
            trace!("correlator peak too weak: {} vs {}", peak, next);
            return false;
        }

        let pos_err = (self.tmp1[shift].arg() * half as f32 / TAU).round() as isize;
        if pos_err.unsigned_abs() > self.guard_len / 2 {
            trace!("correlator timing error {} out of range", pos_err);
            return false;
        }
        let symbol_pos = pos as isize - pos_err;
        if symbol_pos < 0 {
            return false;
        }
        self.symbol_pos = symbol_pos as usize;

        let mut cfo = shift as f32 * (TAU / half as f32) - frac_cfo;
        if cfo >= PI {
            cfo -= TAU;
        }
        self.cfo_rad = cfo;
        debug!(
            "sync symbol at {} cfo {:.5} rad/sample",
            self.symbol_pos, self.cfo_rad
        );
        true
    }
}
