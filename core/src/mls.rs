/// Maximal length sequence generator (Fibonacci form on a shifting register)
#[derive(Debug, Clone)]
pub struct Mls {
    poly: u32,
    test: u32,
    reg: u32,
}

impl Mls {
    pub fn new(poly: u32) -> Self {
        let hibit = 1u32 << (31 - poly.leading_zeros());
        Self {
            poly,
            test: hibit >> 1,
            reg: 1,
        }
    }

    pub fn next_bit(&mut self) -> bool {
        let fb = self.reg & self.test != 0;
        self.reg <<= 1;
        if fb {
            self.reg ^= self.poly;
        }
        fb
    }
}

impl Iterator for Mls {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        Some(self.next_bit())
    }
}
