use crate::XORSHIFT_SEED;

/// Marsaglia's 32-bit xorshift generator
#[derive(Debug, Clone)]
pub struct Xorshift32 {
    y: u32,
}

impl Xorshift32 {
    pub fn new() -> Self {
        Self::with_seed(XORSHIFT_SEED)
    }

    pub fn with_seed(seed: u32) -> Self {
        Self { y: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.y ^= self.y << 13;
        self.y ^= self.y >> 17;
        self.y ^= self.y << 5;
        self.y
    }
}

impl Default for Xorshift32 {
    fn default() -> Self {
        Self::new()
    }
}

/// XOR `data` with the fixed xorshift stream, one draw per byte
///
/// Every packet starts the stream from the same seed, so applying this twice
/// restores the input.
pub fn scramble(data: &mut [u8]) {
    let mut prng = Xorshift32::new();
    for b in data.iter_mut() {
        *b ^= prng.next_u32() as u8;
    }
}

pub fn descramble(data: &mut [u8]) {
    scramble(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_draws() {
        let mut prng = Xorshift32::new();
        let a = prng.next_u32();
        let b = prng.next_u32();
        assert_ne!(a, XORSHIFT_SEED);
        assert_ne!(a, b);
        // reference value of the first step from the seed
        let mut y = XORSHIFT_SEED;
        y ^= y << 13;
        y ^= y >> 17;
        y ^= y << 5;
        assert_eq!(a, y);
    }

    #[test]
    fn test_descramble_restores() {
        let orig: Vec<u8> = (0..=255).collect();
        let mut buf = orig.clone();
        scramble(&mut buf);
        assert_ne!(buf, orig);
        descramble(&mut buf);
        assert_eq!(buf, orig);
    }

    #[test]
    fn test_mask_is_position_dependent() {
        // same byte at two positions gets different masks
        let mut buf = [0x55u8; 16];
        scramble(&mut buf);
        assert!(buf.windows(2).any(|w| w[0] != w[1]));
    }
}
