//! PRNG backing the `random` opcode: uniform range draws, explicit reseed
//! to a fixed sequence, and reseed to an unpredictable one.

use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandMode {
    Predictable,
    RandomUniform,
}

pub struct ZRand {
    rng: Box<dyn RngCore>,
    rand_mode: RandMode,
}

impl ZRand {
    pub fn new(rm: RandMode) -> ZRand {
        ZRand { rng: Box::new(rand::thread_rng()), rand_mode: rm }
    }

    pub fn new_uniform() -> ZRand {
        ZRand::new(RandMode::RandomUniform)
    }

    pub fn new_predictable(seed: u64) -> ZRand {
        ZRand { rng: Box::new(StdRng::seed_from_u64(seed)), rand_mode: RandMode::Predictable }
    }

    pub fn mode(&self) -> RandMode {
        self.rand_mode
    }

    /// Uniform draw in `[0, 32768)`.
    pub fn gen_unsigned_rand(&mut self) -> u16 {
        self.rng.gen_range(0..32768)
    }

    /// `random n` per the standard: `n > 0` draws uniformly from
    /// `[1, n]`; `n < 0` reseeds to a predictable sequence keyed on `n`
    /// and returns 0; `n == 0` reseeds to an unpredictable sequence and
    /// returns 0.
    pub fn random_opcode(&mut self, n: i16) -> u16 {
        match n.cmp(&0) {
            std::cmp::Ordering::Greater => {
                let range = n as u32;
                (self.rng.gen_range(0..range) + 1) as u16
            }
            std::cmp::Ordering::Less => {
                *self = ZRand::new_predictable(n as u64);
                0
            }
            std::cmp::Ordering::Equal => {
                *self = ZRand::new_uniform();
                0
            }
        }
    }
}

impl Default for ZRand {
    fn default() -> Self {
        ZRand::new_uniform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_n_is_in_range() {
        let mut r = ZRand::new_predictable(1);
        for _ in 0..100 {
            let v = r.random_opcode(6);
            assert!((1..=6).contains(&v));
        }
    }

    #[test]
    fn negative_n_reseeds_and_returns_zero() {
        let mut r = ZRand::new_uniform();
        assert_eq!(r.random_opcode(-5), 0);
        assert_eq!(r.mode(), RandMode::Predictable);
    }

    #[test]
    fn zero_reseeds_unpredictably_and_returns_zero() {
        let mut r = ZRand::new_predictable(1);
        assert_eq!(r.random_opcode(0), 0);
        assert_eq!(r.mode(), RandMode::RandomUniform);
    }

    #[test]
    fn same_seed_reproduces_same_sequence() {
        let mut a = ZRand::new_predictable(42);
        let mut b = ZRand::new_predictable(42);
        let seq_a: Vec<u16> = (0..10).map(|_| a.gen_unsigned_rand()).collect();
        let seq_b: Vec<u16> = (0..10).map(|_| b.gen_unsigned_rand()).collect();
        assert_eq!(seq_a, seq_b);
    }
}
