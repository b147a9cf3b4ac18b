use rand::{Rng, RngCore};

/// Bernoulli draw. Zero or negative probabilities never fire.
pub fn roll(rng: &mut dyn RngCore, probability: f64) -> bool {
    probability > 0.0 && rng.gen::<f64>() < probability
}

/// Uniform multiplicative noise in `[1 - spread, 1 + spread]`.
pub fn jitter(rng: &mut dyn RngCore, spread: f64) -> f64 {
    rng.gen_range((1.0 - spread)..=(1.0 + spread))
}

/// Random source that returns the same word on every call.
///
/// `FixedRng::low()` makes every uniform draw 0.0 (every roll with a positive
/// probability fires, jitter sits at its lower bound); `FixedRng::high()`
/// makes draws approach 1.0 (no roll fires, jitter sits at its upper bound).
#[derive(Clone, Copy, Debug)]
pub struct FixedRng(pub u64);

impl FixedRng {
    pub fn low() -> Self {
        FixedRng(0)
    }

    pub fn high() -> Self {
        FixedRng(u64::MAX)
    }
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        (self.0 >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.0.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
