use crate::bch::BchEncoder;
use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::framing::{HeaderEncoder, Metadata, PayloadEncoder};
use crate::mls::Mls;
use crate::modulation::distance_or_default;
use crate::ofdm::{nrz, Geometry, Ofdm};
use crate::polar::PolarCode;
use crate::stream::SampleSink;
use crate::{MLS0_LEN, MLS0_POLY, MLS1_LEN, MLS1_POLY, MLS2_POLY};
use log::debug;
use rustfft::num_complex::Complex32;
use std::f32::consts::PI;

const TONE_RESERVATION_ITERATIONS: usize = 100;

// Tone positions for the configured carrier and mode
#[derive(Debug, Clone, Copy)]
struct Layout {
    config: &'static ModemConfig,
    mls0_off: isize,
    mls1_off: isize,
    code_off: isize,
}

/// Transmit side of the modem
///
/// Call `configure` once, then emit a synchronization symbol, a metadata
/// symbol and any number of data packets. Every symbol is handed to the sink
/// as one block of `guard_len + symbol_len` PCM samples.
pub struct Encoder<S: SampleSink> {
    sink: S,
    geometry: Geometry,
    ofdm: Ofdm,
    bch: BchEncoder,
    layout: Option<Layout>,
    code: Option<PolarCode>,
    fdom: Vec<Complex32>,
    tdom: Vec<Complex32>,
    temp: Vec<Complex32>,
    guard: Vec<Complex32>,
    kern: Vec<Complex32>,
    prev: Vec<Complex32>,
    pcm: Vec<i16>,
    message: Vec<i8>,
    codeword: Vec<i8>,
    // data packets continue from the metadata symbol or the previous packet
    has_reference: bool,
    papr_min: f32,
    papr_max: f32,
}

impl<S: SampleSink> Encoder<S> {
    pub fn new(sink: S, sample_rate: u32) -> Result<Self> {
        let geometry = Geometry::new(sample_rate)?;
        let n = geometry.symbol_len;
        let zero = Complex32::new(0.0, 0.0);
        Ok(Self {
            sink,
            geometry,
            ofdm: Ofdm::new(n),
            bch: BchEncoder::new(),
            layout: None,
            code: None,
            fdom: vec![zero; n],
            tdom: vec![zero; n],
            temp: vec![zero; n],
            guard: vec![zero; geometry.guard_len],
            kern: vec![zero; n],
            prev: Vec::new(),
            pcm: vec![0; geometry.extended_len],
            message: Vec::new(),
            codeword: Vec::new(),
            has_reference: false,
            papr_min: f32::INFINITY,
            papr_max: f32::NEG_INFINITY,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Select the carrier frequency (Hz) and operating mode
    pub fn configure(&mut self, carrier_hz: i32, oper_mode: u8) -> Result<()> {
        let config = ModemConfig::lookup(oper_mode)?;
        if carrier_hz % 50 != 0 {
            return Err(ModemError::InvalidConfig(format!(
                "carrier {} Hz is not a multiple of 50 Hz",
                carrier_hz
            )));
        }
        let half_band = (config.band_width / 2) as i32;
        let nyquist = (self.geometry.sample_rate / 2) as i32;
        if carrier_hz < half_band || carrier_hz > nyquist - half_band {
            return Err(ModemError::InvalidConfig(format!(
                "carrier {} Hz does not fit a {} Hz wide signal",
                carrier_hz, config.band_width
            )));
        }

        let offset = self.geometry.carrier_index(carrier_hz);
        let cols = config.cols() as isize;
        let layout = Layout {
            config,
            mls0_off: offset - (MLS0_LEN as isize - 1),
            mls1_off: offset - MLS1_LEN as isize / 2,
            code_off: offset - cols / 2,
        };

        if config.reserved_tones > 0 {
            let zero = Complex32::new(0.0, 0.0);
            self.kern.fill(zero);
            let fac = 1.0 / (10 * config.reserved_tones) as f32;
            let mut j = layout.code_off - config.reserved_tones as isize / 2;
            for _ in 0..config.reserved_tones {
                if j == layout.code_off {
                    j += cols;
                }
                self.kern[self.geometry.bin(j)] = Complex32::new(fac, 0.0);
                j += 1;
            }
            self.ofdm.inverse(&mut self.kern);
        }

        let cached = self.code.as_ref().map(|c| {
            (c.order(), c.transmitted()) == (config.code_order, config.transmitted_bits())
        });
        if config.has_payload() && cached != Some(true) {
            self.code = Some(PolarCode::for_mode(config));
        }

        self.layout = Some(layout);
        self.has_reference = false;
        self.papr_min = f32::INFINITY;
        self.papr_max = f32::NEG_INFINITY;
        debug!(
            "encoder configured: mode {} carrier {} Hz",
            oper_mode, carrier_hz
        );
        Ok(())
    }

    fn layout(&self) -> Result<Layout> {
        self.layout.ok_or(ModemError::NotConfigured)
    }

    /// Schmidl-Cox preamble; sent without PAPR reduction
    pub fn synchronization_symbol(&mut self) -> Result<()> {
        let layout = self.layout()?;
        let n = self.geometry.symbol_len;
        let g = self.geometry;
        self.fdom.fill(Complex32::new(0.0, 0.0));
        let fac = (2.0 * n as f32 / MLS0_LEN as f32).sqrt();
        self.fdom[g.bin(layout.mls0_off - 2)] = Complex32::new(fac, 0.0);
        let mut seq0 = Mls::new(MLS0_POLY);
        for i in 0..MLS0_LEN as isize {
            let prev = self.fdom[g.bin(layout.mls0_off + 2 * (i - 1))];
            self.fdom[g.bin(layout.mls0_off + 2 * i)] = prev * nrz(seq0.next_bit());
        }
        self.has_reference = false;
        self.symbol(false)
    }

    /// Header symbol carrying the call sign and the configured mode
    pub fn metadata_symbol(&mut self, call_sign: u64) -> Result<()> {
        let layout = self.layout()?;
        let meta = Metadata::new(call_sign, layout.config.oper_mode)?;
        let code = self.bch.encode(&HeaderEncoder::encode(&meta));

        let g = self.geometry;
        let cols = layout.config.cols();
        let fac = (g.symbol_len as f32 / cols as f32).sqrt();
        self.fdom.fill(Complex32::new(0.0, 0.0));
        self.fdom[g.bin(layout.mls1_off - 1)] = Complex32::new(fac, 0.0);
        for (i, &bit) in code.iter().enumerate() {
            let i = i as isize;
            let prev = self.fdom[g.bin(layout.mls1_off + i - 1)];
            self.fdom[g.bin(layout.mls1_off + i)] = prev * nrz(bit == 1);
        }
        let mut seq1 = Mls::new(MLS1_POLY);
        for i in 0..MLS1_LEN as isize {
            self.fdom[g.bin(layout.mls1_off + i)] *= nrz(seq1.next_bit());
        }
        if layout.config.is_comb() {
            let skip = layout.mls1_off - 1..layout.mls1_off + MLS1_LEN as isize;
            for i in layout.code_off..layout.code_off + cols as isize {
                if skip.contains(&i) {
                    continue;
                }
                self.fdom[g.bin(i)] = Complex32::new(fac * nrz(seq1.next_bit()), 0.0);
            }
        }
        self.symbol(true)?;
        self.has_reference = true;
        debug!("metadata symbol: call sign {:#x}", call_sign);
        Ok(())
    }

    /// Encode and transmit one packet of at most `2^(code_order-4)` bytes
    pub fn data_packet(&mut self, data: &[u8]) -> Result<()> {
        let layout = self.layout()?;
        let config = layout.config;
        PayloadEncoder::encode(config, data, &mut self.message)?;
        if !self.has_reference {
            return Err(ModemError::InvalidState(
                "data packet must follow the metadata symbol or another packet",
            ));
        }
        let (Some(code), Some(modulation)) = (self.code.as_ref(), config.modulation()) else {
            return Err(ModemError::NoPayload);
        };
        self.codeword.resize(code.len(), 0);
        code.encode(&self.message, &mut self.codeword);

        let g = self.geometry;
        let cols = config.cols();
        let bits = modulation.bits();
        self.prev.clear();
        self.prev
            .extend((0..cols).map(|i| self.fdom[g.bin(layout.code_off + i as isize)]));

        let mut seq0 = Mls::new(MLS0_POLY);
        let mut k = 0;
        for _ in 0..config.rows {
            for i in 0..cols {
                let b = g.bin(layout.code_off + i as isize);
                if !config.is_comb() {
                    self.prev[i] *= modulation.map(&self.codeword[k..k + bits]);
                    self.fdom[b] = self.prev[i];
                    k += bits;
                } else if config.is_pilot(i) {
                    self.prev[i] *= nrz(seq0.next_bit());
                    self.fdom[b] = self.prev[i];
                } else {
                    self.fdom[b] = self.prev[i] * modulation.map(&self.codeword[k..k + bits]);
                    k += bits;
                }
            }
            self.symbol(true)?;
        }
        if let Some((lo, hi)) = self.papr_db() {
            debug!("PAPR: {:.2} .. {:.2} dB", lo, hi);
        }
        Ok(())
    }

    /// Pseudo-random block over the data tones, useful to open a VOX squelch
    pub fn noise_block(&mut self) -> Result<()> {
        let layout = self.layout()?;
        let g = self.geometry;
        let cols = layout.config.cols();
        let fac = (g.symbol_len as f32 / cols as f32).sqrt();
        self.fdom.fill(Complex32::new(0.0, 0.0));
        let mut seq2 = Mls::new(MLS2_POLY);
        for i in 0..cols as isize {
            self.fdom[g.bin(layout.code_off + i)] = Complex32::new(fac * nrz(seq2.next_bit()), 0.0);
        }
        self.has_reference = false;
        self.symbol(true)
    }

    /// Empty symbol; its guard interval fades out the previous symbol
    pub fn silence_packet(&mut self) -> Result<()> {
        self.fdom.fill(Complex32::new(0.0, 0.0));
        self.has_reference = false;
        self.symbol(true)
    }

    /// Smallest and largest PAPR seen since `configure`, in dB
    pub fn papr_db(&self) -> Option<(f32, f32)> {
        if self.papr_min > self.papr_max {
            return None;
        }
        Some((10.0 * self.papr_min.log10(), 10.0 * self.papr_max.log10()))
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn reserved_tones(&self) -> usize {
        self.layout.map_or(0, |l| l.config.reserved_tones)
    }

    fn symbol(&mut self, papr_reduction: bool) -> Result<()> {
        let n = self.geometry.symbol_len;
        let scale = 1.0 / (2.0 * (n as f32).sqrt());
        self.tdom.copy_from_slice(&self.fdom);
        self.ofdm.inverse(&mut self.tdom);
        for t in self.tdom.iter_mut() {
            *t *= scale;
        }

        let reserved = self.reserved_tones() > 0;
        if papr_reduction {
            self.clip_and_filter(reserved);
            if reserved {
                self.tone_reservation();
            }
        }

        for t in self.tdom.iter_mut() {
            *t = Complex32::new(t.re.clamp(-1.0, 1.0), t.im.clamp(-1.0, 1.0));
        }
        let peak = self.tdom.iter().map(|t| t.norm_sqr()).fold(0.0, f32::max);
        let mean = self.tdom.iter().map(|t| t.norm_sqr()).sum::<f32>() / n as f32;
        if mean > 0.0 {
            let papr = peak / mean;
            self.papr_min = self.papr_min.min(papr);
            self.papr_max = self.papr_max.max(papr);
        }

        let glen = self.geometry.guard_len;
        for i in 0..glen {
            let x = (i as f32 / (glen - 1) as f32).min(0.5) / 0.5;
            let x = 0.5 * (1.0 - (PI * x).cos());
            let tail = self.tdom[i + n - glen];
            let head = self.guard[i];
            self.guard[i] = head + (tail - head) * x;
        }
        for i in 0..glen {
            self.pcm[i] = to_pcm(self.guard[i].re);
            self.guard[i] = self.tdom[i];
        }
        for i in 0..n {
            self.pcm[glen + i] = to_pcm(self.tdom[i].re);
        }
        self.sink.write_block(&self.pcm)
    }

    // Clip to unit magnitude, then pull the in-band spectrum back toward the
    // intended symbol and drop the out-of-band products.
    fn clip_and_filter(&mut self, limit: bool) {
        let n = self.geometry.symbol_len as f32;
        for t in self.tdom.iter_mut() {
            let power = t.norm_sqr();
            if power > 1.0 {
                *t /= power.sqrt();
            }
        }
        self.temp.copy_from_slice(&self.tdom);
        self.ofdm.forward(&mut self.temp);

        let modulation = self.layout.and_then(|l| l.config.modulation());
        let max_err = 0.1 * distance_or_default(modulation);
        let zero = Complex32::new(0.0, 0.0);
        for (t, &f) in self.temp.iter_mut().zip(&self.fdom) {
            if f == zero {
                *t = zero;
                continue;
            }
            *t *= 2.0 / n.sqrt();
            let err = *t - f;
            let mag = err.norm();
            if limit && mag > max_err {
                *t -= err * ((mag - max_err) / mag);
            }
        }
        self.ofdm.inverse(&mut self.temp);
        let scale = 1.0 / (2.0 * n.sqrt());
        for (t, &v) in self.tdom.iter_mut().zip(&self.temp) {
            *t = v * scale;
        }
    }

    // Cancel the largest peak with a shifted copy of the reserved-tone kernel
    fn tone_reservation(&mut self) {
        let n = self.geometry.symbol_len;
        for _ in 0..TONE_RESERVATION_ITERATIONS {
            let mut peak = 0;
            for i in 1..n {
                if self.tdom[i].norm_sqr() > self.tdom[peak].norm_sqr() {
                    peak = i;
                }
            }
            let orig = self.tdom[peak];
            if orig.norm_sqr() <= 1.0 {
                break;
            }
            for (i, t) in self.tdom.iter_mut().enumerate() {
                *t -= orig * self.kern[(n - peak + i) % n];
            }
        }
    }
}

fn to_pcm(v: f32) -> i16 {
    (32767.0 * v).round().clamp(-32768.0, 32767.0) as i16
}
