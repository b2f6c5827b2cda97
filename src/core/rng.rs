//! Deterministic noise source for the wave simulation.
//!
//! A 31-bit linear congruential register. Every draw advances the register
//! once before producing a value, so two generators built from the same seed
//! stay in lockstep forever.

use std::f64::consts::TAU;

const MODULUS: u64 = 1 << 31;
const MULTIPLIER: u64 = 1_103_515_245;
const INCREMENT: u64 = 12_345;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeededRandom {
    register: u64,
}

impl SeededRandom {
    /// Build a generator from an integer seed. Negative seeds use their
    /// absolute value.
    pub fn new(seed: i64) -> Self {
        Self::from_register(seed.unsigned_abs() % MODULUS)
    }

    /// Build a generator from a real-valued seed: floored, absolute value,
    /// then reduced mod 2^31. Non-finite seeds fall back to register 1.
    pub fn from_f64(seed: f64) -> Self {
        if !seed.is_finite() {
            return Self::from_register(1);
        }
        let reduced = seed.floor().abs().rem_euclid(MODULUS as f64);
        Self::from_register(reduced as u64)
    }

    fn from_register(register: u64) -> Self {
        // 0 is a fixed point of the update rule.
        let register = if register == 0 { 1 } else { register };
        Self { register }
    }

    pub fn register(&self) -> u32 {
        self.register as u32
    }

    fn step(&mut self) -> u64 {
        self.register = (MULTIPLIER * self.register + INCREMENT) % MODULUS;
        self.register
    }

    /// Uniform draw in [0, 1).
    pub fn next_float(&mut self) -> f64 {
        self.step() as f64 / MODULUS as f64
    }

    fn next_nonzero_float(&mut self) -> f64 {
        loop {
            let x = self.next_float();
            if x != 0.0 {
                return x;
            }
        }
    }

    /// Standard normal variate via Box-Muller. Spends exactly two non-zero
    /// uniform draws per call; the paired variate is discarded.
    pub fn next_normal(&mut self) -> f64 {
        let u = self.next_nonzero_float();
        let v = self.next_nonzero_float();
        (-2.0 * u.ln()).sqrt() * (TAU * v).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_sequence_matches_update_rule() {
        let mut rng = SeededRandom::new(42);
        assert_eq!(rng.register(), 42);
        let x = rng.next_float();
        assert_eq!(rng.register(), 1_250_496_027);
        assert!((x - 0.582_307_589_706_033_5).abs() < 1e-15);
        rng.next_float();
        assert_eq!(rng.register(), 1_116_302_264);
        rng.next_float();
        assert_eq!(rng.register(), 1_000_676_753);
    }

    #[test]
    fn zero_seed_is_forced_to_one() {
        assert_eq!(SeededRandom::new(0).register(), 1);
        assert_eq!(SeededRandom::from_f64(0.4).register(), 1);
        assert_eq!(SeededRandom::new(1i64 << 31).register(), 1);
    }

    #[test]
    fn seeds_are_normalized() {
        assert_eq!(SeededRandom::new(-42), SeededRandom::new(42));
        // floor(-7.9) = -8, then absolute value
        assert_eq!(SeededRandom::from_f64(-7.9).register(), 8);
        assert_eq!(SeededRandom::from_f64(42.99), SeededRandom::new(42));
        assert_eq!(SeededRandom::from_f64(f64::NAN).register(), 1);
        assert_eq!(
            SeededRandom::new((1i64 << 31) + 5),
            SeededRandom::new(5)
        );
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut rng = SeededRandom::new(7);
        for _ in 0..10_000 {
            let x = rng.next_float();
            assert!((0.0..1.0).contains(&x), "out of range: {x}");
        }
    }

    #[test]
    fn normal_spends_two_draws() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        let z = a.next_normal();
        b.next_float();
        b.next_float();
        assert_eq!(a, b);
        assert!((z - (-1.031_905_526_942_274_8)).abs() < 1e-12, "z={z}");
    }

    #[test]
    fn normal_moments_are_close_to_standard() {
        let mut rng = SeededRandom::new(2024);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| rng.next_normal()).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1) as f64;
        assert!(mean.abs() < 0.05, "mean={mean}");
        assert!((var - 1.0).abs() < 0.1, "var={var}");
    }
}
