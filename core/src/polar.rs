//! Parity-aided polar code: frozen set construction and encoding
//!
//! The frozen set depends on how many code bits survive puncturing, so it is
//! built per operating mode rather than per code order. Positions that the
//! shuffle pushes past the end of the transmitted stream are treated as
//! erased channels when ranking bit reliabilities.

use crate::config::ModemConfig;
use crate::shuffle::BitShuffle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitKind {
    Frozen,
    Parity,
    Message,
}

#[derive(Debug, Clone)]
pub struct PolarCode {
    order: u32,
    kinds: Vec<BitKind>,
    message_len: usize,
    transmitted: usize,
    shuffle: BitShuffle,
}

/// Number of parity bits among the first `k` information positions
fn parity_count(k: usize, stride: usize, first: usize) -> usize {
    if k <= first {
        0
    } else {
        (k - first - 1) / stride + 1
    }
}

// Bhattacharyya parameters and erasure flags of the synthesized bit channels
fn reliabilities(z: &[f64], erased: &[bool], out_z: &mut Vec<f64>, out_e: &mut Vec<bool>) {
    if z.len() == 1 {
        out_z.push(z[0]);
        out_e.push(erased[0]);
        return;
    }
    let h = z.len() / 2;
    let (za, zb) = z.split_at(h);
    let (ea, eb) = erased.split_at(h);
    let worse: Vec<f64> = za.iter().zip(zb).map(|(a, b)| a + b - a * b).collect();
    let worse_e: Vec<bool> = ea.iter().zip(eb).map(|(a, b)| *a || *b).collect();
    let better: Vec<f64> = za.iter().zip(zb).map(|(a, b)| a * b).collect();
    let better_e: Vec<bool> = ea.iter().zip(eb).map(|(a, b)| *a && *b).collect();
    reliabilities(&worse, &worse_e, out_z, out_e);
    reliabilities(&better, &better_e, out_z, out_e);
}

impl PolarCode {
    /// Build a code of length `2^order` carrying `message_len` bits when only
    /// the first `transmitted` shuffled code bits reach the receiver
    pub fn new(
        order: u32,
        transmitted: usize,
        message_len: usize,
        parity_stride: usize,
        first_parity: usize,
    ) -> Self {
        let len = 1usize << order;
        let transmitted = transmitted.min(len);
        let shuffle = BitShuffle::new(len);

        let mut position: Vec<usize> = (0..len).collect();
        shuffle.shuffle(&mut position);
        let mut erased = vec![false; len];
        for &p in &position[transmitted..] {
            erased[p] = true;
        }
        let z: Vec<f64> = erased.iter().map(|&e| if e { 1.0 } else { 0.5 }).collect();
        let mut bit_z = Vec::with_capacity(len);
        let mut bit_e = Vec::with_capacity(len);
        reliabilities(&z, &erased, &mut bit_z, &mut bit_e);

        let mut info = message_len;
        while info - parity_count(info, parity_stride, first_parity) < message_len {
            info += 1;
        }
        let info = info.min(len);

        let mut order_idx: Vec<usize> = (0..len).collect();
        order_idx.sort_by(|&a, &b| {
            bit_e[a]
                .cmp(&bit_e[b])
                .then(bit_z[a].total_cmp(&bit_z[b]))
                .then(a.cmp(&b))
        });
        let mut kinds = vec![BitKind::Frozen; len];
        for &i in &order_idx[..info] {
            kinds[i] = BitKind::Message;
        }
        for (j, kind) in kinds
            .iter_mut()
            .filter(|k| **k != BitKind::Frozen)
            .enumerate()
        {
            if j % parity_stride == first_parity {
                *kind = BitKind::Parity;
            }
        }

        Self {
            order,
            kinds,
            message_len,
            transmitted,
            shuffle,
        }
    }

    pub fn for_mode(config: &ModemConfig) -> Self {
        let (stride, first) = config.parity_params();
        Self::new(
            config.code_order,
            config.transmitted_bits(),
            config.message_bits(),
            stride,
            first,
        )
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn message_len(&self) -> usize {
        self.message_len
    }

    pub fn transmitted(&self) -> usize {
        self.transmitted
    }

    pub fn kind(&self, index: usize) -> BitKind {
        self.kinds[index]
    }

    pub fn shuffle(&self) -> &BitShuffle {
        &self.shuffle
    }

    /// Encode NRZ message bits into a shuffled NRZ codeword of `len()` bits
    pub fn encode(&self, message: &[i8], codeword: &mut [i8]) {
        debug_assert_eq!(message.len(), self.message_len);
        debug_assert_eq!(codeword.len(), self.len());
        let mut msg = message.iter();
        let mut parity = 1i8;
        for (c, kind) in codeword.iter_mut().zip(&self.kinds) {
            *c = match kind {
                BitKind::Frozen => 1,
                BitKind::Parity => std::mem::replace(&mut parity, 1),
                BitKind::Message => {
                    let m = msg.next().copied().unwrap_or(1);
                    parity *= m;
                    m
                }
            };
        }
        let len = codeword.len();
        let mut h = 1;
        while h < len {
            for block in codeword.chunks_mut(2 * h) {
                let (lo, hi) = block.split_at_mut(h);
                for (a, b) in lo.iter_mut().zip(hi.iter()) {
                    *a *= *b;
                }
            }
            h *= 2;
        }
        self.shuffle.shuffle(codeword);
    }
}
