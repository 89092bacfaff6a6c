//! Order-2 ordered statistics decoder for the BCH(255,71) header
//!
//! Columns of the generator matrix are sorted by the reliability of the
//! received soft bits and reduced to systematic form over the most reliable
//! basis. The hard decision on that basis, and every pattern of one or two
//! flips of it, are re-encoded and scored by correlation with the soft
//! input.

use crate::bch::BCH_LEN;
use crate::HEADER_BITS;

pub struct OsdDecoder {
    genmat: Vec<Vec<u8>>,
    work: Vec<Vec<u8>>,
    perm: Vec<usize>,
    soft: Vec<i32>,
    base: Vec<u8>,
    cand: Vec<u8>,
    best: Vec<u8>,
    pivot: Vec<u8>,
    out: Vec<u8>,
}

/// Outcome of a decode: the 71 systematic bits and whether the best
/// codeword beat every other candidate
///
/// The bits borrow the decoder's output buffer, so a decode never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsdResult<'a> {
    pub bits: &'a [u8],
    pub unique: bool,
}

impl OsdDecoder {
    pub fn new(genmat: Vec<Vec<u8>>) -> Self {
        Self {
            genmat,
            work: vec![vec![0; BCH_LEN]; HEADER_BITS],
            perm: (0..BCH_LEN).collect(),
            soft: vec![0; BCH_LEN],
            base: vec![0; BCH_LEN],
            cand: vec![0; BCH_LEN],
            best: vec![0; BCH_LEN],
            pivot: vec![0; BCH_LEN],
            out: vec![0; BCH_LEN],
        }
    }

    pub fn decode(&mut self, soft: &[i8]) -> OsdResult<'_> {
        let n = BCH_LEN;
        let k = HEADER_BITS;

        // most reliable positions first
        self.perm.clear();
        self.perm.extend(0..n);
        // ties keep index order
        self.perm
            .sort_unstable_by_key(|&i| (std::cmp::Reverse((soft[i] as i32).abs()), i));
        for (row, src) in self.work.iter_mut().zip(&self.genmat) {
            for (c, &p) in self.perm.iter().enumerate() {
                row[c] = src[p];
            }
        }

        // systematic form over the first k independent columns
        let mut r = 0;
        let mut c = 0;
        while r < k && c < n {
            let Some(pivot) = (r..k).find(|&rr| self.work[rr][c] == 1) else {
                c += 1;
                continue;
            };
            self.work.swap(r, pivot);
            std::mem::swap(&mut self.pivot, &mut self.work[r]);
            for (rr, row) in self.work.iter_mut().enumerate() {
                if rr != r && row[c] == 1 {
                    for (a, &b) in row.iter_mut().zip(&self.pivot) {
                        *a ^= b;
                    }
                }
            }
            std::mem::swap(&mut self.pivot, &mut self.work[r]);
            if c != r {
                for row in self.work.iter_mut() {
                    row.swap(c, r);
                }
                self.perm.swap(c, r);
            }
            r += 1;
            c += 1;
        }

        for (s, &p) in self.soft.iter_mut().zip(&self.perm) {
            *s = soft[p] as i32;
        }

        self.base.fill(0);
        for i in 0..k {
            if self.soft[i] < 0 {
                for (b, &g) in self.base.iter_mut().zip(&self.work[i]) {
                    *b ^= g;
                }
            }
        }

        let mut best = metric(&self.soft, &self.base);
        let mut next = i32::MIN;
        self.best.copy_from_slice(&self.base);

        for a in 0..k {
            for b in a..k {
                for ((c, &x), (&ga, &gb)) in self
                    .cand
                    .iter_mut()
                    .zip(&self.base)
                    .zip(self.work[a].iter().zip(&self.work[b]))
                {
                    *c = if a == b { x ^ ga } else { x ^ ga ^ gb };
                }
                let m = metric(&self.soft, &self.cand);
                if m > best {
                    next = best;
                    best = m;
                    self.best.copy_from_slice(&self.cand);
                } else if m > next {
                    next = m;
                }
            }
        }

        for (&b, &p) in self.best.iter().zip(&self.perm) {
            self.out[p] = b;
        }
        OsdResult {
            bits: &self.out[..k],
            unique: best != next,
        }
    }
}

// correlation of soft values with the NRZ image of a codeword
fn metric(soft: &[i32], code: &[u8]) -> i32 {
    soft.iter()
        .zip(code)
        .map(|(&s, &c)| if c == 0 { s } else { -s })
        .sum()
}
