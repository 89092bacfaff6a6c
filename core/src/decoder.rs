use crate::bch::BchEncoder;
use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::filters::{BlockDc, Hilbert};
use crate::framing::{HeaderDecoder, Metadata, PayloadDecoder};
use crate::mls::Mls;
use crate::modulation::{quantize, Modulation};
use crate::ofdm::{demod_or_erase, nrz, Geometry, Ofdm};
use crate::osd::OsdDecoder;
use crate::phasor::Phasor;
use crate::polar::PolarCode;
use crate::polar_list::PolarListDecoder;
use crate::stream::SampleSource;
use crate::sync::{History, SchmidlCox};
use crate::theil_sen::{Line, TheilSen};
use crate::{MLS0_POLY, MLS1_LEN, MLS1_POLY, PRECISION_MAX, SOFT_MAX};
use log::{debug, trace, warn};
use rustfft::num_complex::Complex32;
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy)]
enum State {
    Searching,
    Synced,
    Header(&'static ModemConfig),
}

/// Channel statistics of the most recent data packet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketReport {
    /// Signal to noise ratio of every row in dB, infinite for a clean row
    pub row_snr_db: Vec<f32>,
    /// Pilot tones seen over the whole packet, zero outside comb modes
    pub pilots: usize,
    /// Pilots whose sign disagreed with the known sequence after tracking
    pub pilot_errors: usize,
    /// List decoder path that passed the CRC
    pub lane: Option<usize>,
}

impl PacketReport {
    /// Mean of the finite row SNRs
    pub fn mean_snr_db(&self) -> Option<f32> {
        let finite: Vec<f32> = self
            .row_snr_db
            .iter()
            .copied()
            .filter(|s| s.is_finite())
            .collect();
        if finite.is_empty() {
            return None;
        }
        Some(finite.iter().sum::<f32>() / finite.len() as f32)
    }
}

/// Receive side of the modem
///
/// Pulls samples from the source one at a time. `synchronization_symbol`
/// searches for a preamble, `metadata_symbol` reads the header that follows
/// it and each `data_packet` call decodes the next packet of the burst.
pub struct Decoder<S: SampleSource> {
    source: S,
    geometry: Geometry,
    state: State,
    blockdc: BlockDc,
    hilbert: Hilbert,
    history: History,
    correlator: SchmidlCox,
    phasor: Phasor,
    ofdm: Ofdm,
    osd: OsdDecoder,
    list: PolarListDecoder,
    code: Option<PolarCode>,
    theil_sen: TheilSen,
    // start of the next symbol within the history window
    symbol_pos: usize,
    cfo_rad: f32,
    fdom: Vec<Complex32>,
    cons: Vec<Complex32>,
    prev: Vec<Complex32>,
    xs: Vec<f32>,
    ys: Vec<f32>,
    soft: Vec<i8>,
    report: PacketReport,
}

impl<S: SampleSource> Decoder<S> {
    pub fn new(source: S, sample_rate: u32) -> Result<Self> {
        let geometry = Geometry::new(sample_rate)?;
        let n = geometry.symbol_len;
        Ok(Self {
            source,
            geometry,
            state: State::Searching,
            blockdc: BlockDc::new(geometry.filter_len),
            hilbert: Hilbert::new(geometry.filter_len),
            history: History::new(geometry.buffer_len),
            correlator: SchmidlCox::new(&geometry),
            phasor: Phasor::new(),
            ofdm: Ofdm::new(n),
            osd: OsdDecoder::new(BchEncoder::new().generator_matrix()),
            list: PolarListDecoder::new(),
            code: None,
            theil_sen: TheilSen::new(),
            symbol_pos: 0,
            cfo_rad: 0.0,
            fdom: vec![Complex32::new(0.0, 0.0); n],
            cons: Vec::new(),
            prev: Vec::new(),
            xs: Vec::new(),
            ys: Vec::new(),
            soft: Vec::new(),
            report: PacketReport::default(),
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Carrier frequency offset of the last synchronization in Hz
    pub fn cfo_hz(&self) -> f32 {
        self.cfo_rad * self.geometry.sample_rate as f32 / TAU
    }

    pub fn last_packet(&self) -> &PacketReport {
        &self.report
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Consume samples until a synchronization symbol is found
    ///
    /// The correlator runs `3 * extended_len - symbol_len` samples behind the
    /// newest sample of its history, so a sync symbol is reported only that
    /// long after it arrived. A transmission that ends sooner, such as a beacon
    /// with no trailing audio, yields `SyncNotFound`; senders should follow
    /// a burst with at least `3 * extended_len` samples of silence.
    pub fn synchronization_symbol(&mut self) -> Result<()> {
        self.state = State::Searching;
        loop {
            match self.pull() {
                Ok(true) => break,
                Ok(false) => {}
                Err(ModemError::SourceExhausted) => return Err(ModemError::SyncNotFound),
                Err(e) => return Err(e),
            }
        }
        self.symbol_pos = self.correlator.symbol_pos() + self.geometry.extended_len;
        self.cfo_rad = self.correlator.cfo_rad();
        self.state = State::Synced;
        debug!(
            "synchronized: cfo {:.2} Hz, symbol at {}",
            self.cfo_hz(),
            self.symbol_pos
        );
        Ok(())
    }

    /// Decode the header following the synchronization symbol
    ///
    /// Any failure returns the decoder to the searching state.
    pub fn metadata_symbol(&mut self) -> Result<Metadata> {
        if !matches!(self.state, State::Synced) {
            return Err(ModemError::InvalidState(
                "metadata symbol must follow a synchronization symbol",
            ));
        }
        self.state = State::Searching;
        self.phasor.start(-self.cfo_rad);
        self.read_symbol()?;

        let g = self.geometry;
        let off = -(MLS1_LEN as isize / 2);
        let mut seq1 = Mls::new(MLS1_POLY);
        let mut soft = [0i8; MLS1_LEN];
        let mut prev = self.fdom[g.bin(off - 1)];
        for (i, s) in soft.iter_mut().enumerate() {
            let cur = self.fdom[g.bin(off + i as isize)] * nrz(seq1.next_bit());
            *s = quantize(SOFT_MAX as f32 * demod_or_erase(cur, prev).re);
            prev = cur;
        }

        let result = self.osd.decode(&soft);
        if !result.unique {
            warn!("header rejected: ambiguous decode");
            return Err(ModemError::OsdNotUnique);
        }
        let meta = HeaderDecoder::decode(result.bits).map_err(|e| {
            warn!("header rejected: {}", e);
            e
        })?;
        let config = ModemConfig::lookup(meta.oper_mode)?;
        debug!(
            "header: call sign {:?} mode {}",
            meta.call_sign_text(),
            meta.oper_mode
        );
        self.state = State::Header(config);
        Ok(meta)
    }

    /// Decode the next data packet of the burst
    ///
    /// Returns the full packet capacity of the mode; shorter payloads come
    /// back zero padded. A CRC failure leaves the decoder at the following
    /// packet.
    pub fn data_packet(&mut self) -> Result<Vec<u8>> {
        let config = match self.state {
            State::Header(config) => config,
            _ => {
                return Err(ModemError::InvalidState(
                    "data packet must follow a metadata symbol",
                ))
            }
        };
        let Some(modulation) = config.modulation().filter(|_| config.has_payload()) else {
            self.state = State::Searching;
            return Err(ModemError::NoPayload);
        };

        if let Err(e) = self.demodulate(config, modulation) {
            self.state = State::Searching;
            return Err(e);
        }

        let stale = self.code.as_ref().map_or(true, |c| {
            (c.order(), c.transmitted()) != (config.code_order, config.transmitted_bits())
        });
        if stale {
            self.code = Some(PolarCode::for_mode(config));
        }
        let Some(code) = self.code.as_ref() else {
            return Err(ModemError::NoPayload);
        };
        self.list.decode(code, &self.soft);

        for lane in 0..self.list.lanes() {
            if let Some(data) = PayloadDecoder::decode(config, self.list.candidate(lane)) {
                trace!("lane {} passed CRC, metric {}", lane, self.list.metric(lane));
                self.report.lane = Some(lane);
                return Ok(data);
            }
            trace!("lane {} failed CRC", lane);
        }
        warn!("payload rejected: no list path passed the CRC");
        Err(ModemError::PayloadCrcMismatch)
    }

    fn pull(&mut self) -> Result<bool> {
        let x = self.source.next_sample()? as f32 / 32768.0;
        let c = self.hilbert.process(self.blockdc.process(x));
        self.history.push(c);
        Ok(self.correlator.process(self.history.window()))
    }

    // Bring the next symbol fully into the history, then remove the carrier
    // offset and transform it into `fdom`.
    fn read_symbol(&mut self) -> Result<()> {
        let n = self.geometry.symbol_len;
        let end = self.symbol_pos + n;
        if end > self.geometry.buffer_len {
            let need = end - self.geometry.buffer_len;
            for _ in 0..need {
                self.pull()?;
            }
            self.symbol_pos -= need;
        }
        let start = self.symbol_pos;
        let window = self.history.window();
        for (f, &s) in self.fdom.iter_mut().zip(&window[start..start + n]) {
            *f = s * self.phasor.next_value();
        }
        self.phasor.advance(self.geometry.guard_len);
        self.symbol_pos += self.geometry.extended_len;
        self.ofdm.forward(&mut self.fdom);
        Ok(())
    }

    // Demodulate all rows of a packet into soft bits
    fn demodulate(&mut self, config: &ModemConfig, modulation: Modulation) -> Result<()> {
        let g = self.geometry;
        let cols = config.cols();
        let code_off = -(cols as isize / 2);
        let x = |i: usize| (code_off + i as isize) as f32;
        let rot = |line: &Line, i: usize| Complex32::from_polar(1.0, line.at(x(i)));

        self.prev.clear();
        self.prev
            .extend((0..cols).map(|i| self.fdom[g.bin(code_off + i as isize)]));
        self.cons.resize(cols, Complex32::new(0.0, 0.0));
        self.soft.clear();
        self.report = PacketReport::default();

        let mut seq0 = Mls::new(MLS0_POLY);
        let mut bits = [0i8; 6];
        for row in 0..config.rows {
            self.read_symbol()?;
            for i in 0..cols {
                self.cons[i] = demod_or_erase(self.fdom[g.bin(code_off + i as isize)], self.prev[i]);
            }

            if config.is_comb() {
                self.xs.clear();
                self.ys.clear();
                for i in (0..cols).filter(|&i| config.is_pilot(i)) {
                    self.cons[i] *= nrz(seq0.next_bit());
                    self.xs.push(x(i));
                    self.ys.push(self.cons[i].arg());
                }
                let line = self.theil_sen.fit(&self.xs, &self.ys);
                for i in 0..cols {
                    self.cons[i] *= rot(&line, i).conj();
                    if config.is_pilot(i) {
                        self.prev[i] = self.fdom[g.bin(code_off + i as isize)];
                    } else {
                        self.prev[i] *= rot(&line, i);
                    }
                }
            }

            self.xs.clear();
            self.ys.clear();
            for i in 0..cols {
                self.xs.push(x(i));
                let c = self.cons[i];
                if config.is_pilot(i) {
                    self.ys.push(c.arg());
                } else {
                    self.ys.push((c * modulation.hard(c).conj()).arg());
                }
            }
            let line = self.theil_sen.fit(&self.xs, &self.ys);
            for i in 0..cols {
                self.cons[i] *= rot(&line, i).conj();
                if !config.is_comb() {
                    self.prev[i] = self.fdom[g.bin(code_off + i as isize)];
                } else if !config.is_pilot(i) {
                    self.prev[i] *= rot(&line, i);
                }
            }

            let mut signal = 0.0;
            let mut noise = 0.0;
            for i in 0..cols {
                let c = self.cons[i];
                let hard = if config.is_comb() {
                    if !config.is_pilot(i) {
                        continue;
                    }
                    self.report.pilots += 1;
                    if c.re < 0.0 {
                        self.report.pilot_errors += 1;
                    }
                    Complex32::new(1.0, 0.0)
                } else {
                    modulation.hard(c)
                };
                signal += hard.norm_sqr();
                noise += (c - hard).norm_sqr();
            }
            let precision = if noise > 0.0 {
                (signal / noise).min(PRECISION_MAX)
            } else {
                PRECISION_MAX
            };
            let snr_db = if noise > 0.0 {
                10.0 * (signal / noise).log10()
            } else {
                f32::INFINITY
            };
            debug!("row {}: snr {:.1} dB", row, snr_db);
            self.report.row_snr_db.push(snr_db);

            for i in (0..cols).filter(|&i| !config.is_pilot(i)) {
                modulation.soft(self.cons[i], precision, &mut bits);
                self.soft.extend_from_slice(&bits[..modulation.bits()]);
            }
        }
        Ok(())
    }
}
