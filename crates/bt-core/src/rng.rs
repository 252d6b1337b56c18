/// Deterministic RNG helpers for random gates.
///
/// Small and dependency-free; **not** cryptographic. Every random decision
/// in the scheduler derives its stream from (global seed, agent, node) so
/// replays with the same seed make the same choices.

/// SplitMix64 generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        mix64(self.state)
    }

    /// Uniform float in (0, 1) using 24 mantissa bits.
    pub fn next_f32_unit(&mut self) -> f32 {
        let x = (self.next_u64() as u32) >> 8;
        (x as f32) / ((1u32 << 24) as f32)
    }

    /// Bernoulli draw; `probability` outside [0, 1] saturates.
    pub fn chance(&mut self, probability: f32) -> bool {
        self.next_f32_unit() < probability
    }
}

pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

pub fn derive_seed(global_seed: u64, agent_id: u64, stream: u64) -> u64 {
    let x = global_seed ^ mix64(agent_id.wrapping_add(0x9E3779B97F4A7C15)) ^ mix64(stream);
    mix64(x)
}
