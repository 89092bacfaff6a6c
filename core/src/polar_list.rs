//! Successive cancellation list decoder for the parity-aided polar code
//!
//! All list paths are decoded together: every soft and hard value is a
//! fixed-width array with one lane per path, so the inner loops vectorize.
//! Forks keep the best `LANES` of the `2 * LANES` extensions and return a lane
//! map that callers apply to their own per-lane state.

use crate::polar::{BitKind, PolarCode};
use crate::{CODE_ORDER_MAX, SOFT_MAX};

#[cfg(target_feature = "avx2")]
pub const LANES: usize = 32;
#[cfg(not(target_feature = "avx2"))]
pub const LANES: usize = 16;

type Lane<T> = [T; LANES];
type Map = Lane<u8>;

const IDENTITY: Map = {
    let mut map = [0u8; LANES];
    let mut k = 0;
    while k < LANES {
        map[k] = k as u8;
        k += 1;
    }
    map
};

// metric that keeps unused lanes at the bottom until the list fills up
const START_PENALTY: i32 = 1 << 20;

fn lanes<T: Copy + Default, F: FnMut(usize) -> T>(mut f: F) -> Lane<T> {
    let mut out = [T::default(); LANES];
    for (k, o) in out.iter_mut().enumerate() {
        *o = f(k);
    }
    out
}

fn check_node(a: i8, b: i8) -> i8 {
    let mag = a.unsigned_abs().min(b.unsigned_abs()) as i8;
    if (a < 0) == (b < 0) {
        mag
    } else {
        -mag
    }
}

fn bit_node(a: i8, b: i8, hard: i8) -> i8 {
    let max = SOFT_MAX as i16;
    (b as i16 + hard as i16 * a as i16).clamp(-max, max) as i8
}

pub struct PolarListDecoder {
    soft: Vec<Lane<i8>>,
    hard: Vec<Lane<i8>>,
    received: Vec<i8>,
    metric: Lane<i32>,
    parity: Lane<i8>,
    messages: Vec<Lane<i8>>,
    maps: Vec<Map>,
}

impl PolarListDecoder {
    /// Buffers are sized once for the longest supported code
    pub fn new() -> Self {
        let max_len = 1usize << CODE_ORDER_MAX;
        Self {
            soft: vec![[0; LANES]; 2 * max_len],
            hard: vec![[0; LANES]; max_len],
            received: vec![0; max_len],
            metric: [0; LANES],
            parity: [1; LANES],
            messages: Vec::with_capacity(max_len),
            maps: Vec::with_capacity(max_len),
        }
    }

    /// Decode soft bits in transmission order
    ///
    /// `received` may be shorter than the code; missing bits are erasures.
    /// Afterwards `candidate(k)` yields the message bits of list path `k`,
    /// best path metric first.
    pub fn decode(&mut self, code: &PolarCode, received: &[i8]) {
        let len = code.len();
        let rx = &mut self.received[..len];
        rx.fill(0);
        let n = received.len().min(len);
        rx[..n].copy_from_slice(&received[..n]);
        code.shuffle().unshuffle(rx);

        for (s, &r) in self.soft[len..2 * len].iter_mut().zip(rx.iter()) {
            *s = [r; LANES];
        }
        self.metric = [START_PENALTY; LANES];
        self.metric[0] = 0;
        self.parity = [1; LANES];
        self.messages.clear();
        self.maps.clear();

        self.node(code, len, 0);

        for i in (1..self.messages.len()).rev() {
            let map = self.maps[i];
            let prev_msg = self.messages[i - 1];
            let prev_map = self.maps[i - 1];
            self.messages[i - 1] = lanes(|k| prev_msg[map[k] as usize]);
            self.maps[i - 1] = lanes(|k| prev_map[map[k] as usize]);
        }
    }

    pub fn lanes(&self) -> usize {
        LANES
    }

    /// NRZ message bits of list path `lane`
    pub fn candidate(&self, lane: usize) -> impl Iterator<Item = i8> + '_ {
        self.messages.iter().map(move |m| m[lane])
    }

    pub fn metric(&self, lane: usize) -> i32 {
        self.metric[lane]
    }

    // Node of size `n` reads soft[n..2n] and writes its children's input to
    // soft[n/2..n]; hard decisions land in hard[offset..offset + n].
    fn node(&mut self, code: &PolarCode, n: usize, offset: usize) -> Map {
        if n == 1 {
            return self.leaf(code, offset);
        }
        let h = n / 2;
        for i in 0..h {
            let a = self.soft[n + i];
            let b = self.soft[n + h + i];
            self.soft[h + i] = lanes(|k| check_node(a[k], b[k]));
        }
        let lmap = self.node(code, h, offset);
        for i in 0..h {
            let a = self.soft[n + i];
            let b = self.soft[n + h + i];
            let hard = self.hard[offset + i];
            self.soft[h + i] = lanes(|k| {
                let p = lmap[k] as usize;
                bit_node(a[p], b[p], hard[k])
            });
        }
        let rmap = self.node(code, h, offset + h);
        for i in 0..h {
            let left = self.hard[offset + i];
            let right = self.hard[offset + h + i];
            self.hard[offset + i] = lanes(|k| left[rmap[k] as usize] * right[k]);
        }
        lanes(|k| lmap[rmap[k] as usize])
    }

    fn leaf(&mut self, code: &PolarCode, index: usize) -> Map {
        let s = self.soft[1];
        match code.kind(index) {
            BitKind::Frozen => {
                for (m, &v) in self.metric.iter_mut().zip(&s) {
                    if v < 0 {
                        *m -= v as i32;
                    }
                }
                self.hard[index] = [1; LANES];
                IDENTITY
            }
            BitKind::Parity => {
                let hard = self.parity;
                for k in 0..LANES {
                    if (s[k] as i32) * (hard[k] as i32) < 0 {
                        self.metric[k] += (s[k] as i32).abs();
                    }
                }
                self.parity = [1; LANES];
                self.hard[index] = hard;
                IDENTITY
            }
            BitKind::Message => {
                let mut fork = [(0i32, 0u8); 2 * LANES];
                for k in 0..LANES {
                    let v = s[k] as i32;
                    fork[2 * k] = (self.metric[k] + if v < 0 { -v } else { 0 }, (2 * k) as u8);
                    fork[2 * k + 1] = (self.metric[k] + if v > 0 { v } else { 0 }, (2 * k + 1) as u8);
                }
                fork.sort_by_key(|c| c.0);
                let map: Map = lanes(|k| fork[k].1 >> 1);
                let hard: Lane<i8> = lanes(|k| if fork[k].1 & 1 == 1 { -1 } else { 1 });
                self.metric = lanes(|k| fork[k].0);
                let parity = self.parity;
                self.parity = lanes(|k| parity[map[k] as usize] * hard[k]);
                self.hard[index] = hard;
                self.messages.push(hard);
                self.maps.push(map);
                map
            }
        }
    }
}

impl Default for PolarListDecoder {
    fn default() -> Self {
        Self::new()
    }
}
