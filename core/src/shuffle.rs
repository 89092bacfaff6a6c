use crate::xorshift::Xorshift32;

/// Keyed Fisher-Yates permutation of a fixed block size
///
/// The swap targets come from a fresh xorshift stream, so encoder and decoder
/// derive the same permutation from the block size alone.
#[derive(Debug, Clone)]
pub struct BitShuffle {
    swaps: Vec<u32>,
}

impl BitShuffle {
    pub fn new(len: usize) -> Self {
        let mut prng = Xorshift32::new();
        let swaps = (0..len.saturating_sub(1))
            .map(|i| (i + prng.next_u32() as usize % (len - i)) as u32)
            .collect();
        Self { swaps }
    }

    pub fn len(&self) -> usize {
        if self.swaps.is_empty() {
            0
        } else {
            self.swaps.len() + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }

    pub fn shuffle<T>(&self, data: &mut [T]) {
        for (i, &j) in self.swaps.iter().enumerate() {
            data.swap(i, j as usize);
        }
    }

    pub fn unshuffle<T>(&self, data: &mut [T]) {
        for (i, &j) in self.swaps.iter().enumerate().rev() {
            data.swap(i, j as usize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_permutation() {
        let shuffle = BitShuffle::new(1024);
        let mut idx: Vec<usize> = (0..1024).collect();
        shuffle.shuffle(&mut idx);
        assert_ne!(idx, (0..1024).collect::<Vec<_>>());
        let mut sorted = idx.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..1024).collect::<Vec<_>>());
    }

    #[test]
    fn test_unshuffle_inverts() {
        let shuffle = BitShuffle::new(4096);
        let orig: Vec<u16> = (0..4096).collect();
        let mut data = orig.clone();
        shuffle.shuffle(&mut data);
        shuffle.unshuffle(&mut data);
        assert_eq!(data, orig);
        assert_eq!(shuffle.len(), 4096);
    }

    #[test]
    fn test_deterministic() {
        let mut a: Vec<u32> = (0..2048).collect();
        let mut b = a.clone();
        BitShuffle::new(2048).shuffle(&mut a);
        BitShuffle::new(2048).shuffle(&mut b);
        assert_eq!(a, b);
    }
}
