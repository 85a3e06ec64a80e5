use std::time::{SystemTime, UNIX_EPOCH};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::foundation::math::{Fnv1a64, to_hexadecimal};

/// Length in bytes of a freshly generated seed (24 hex characters).
const SEED_BYTE_LEN: usize = 12;

/// Seeded source of uniform randomness.
///
/// The generator stream is derived from the seed string alone, so two `Rng`s
/// built from the same seed produce bit-identical draw sequences on every
/// platform. The active seed is logged at construction so a run can be
/// replayed by passing it back in.
#[derive(Clone, Debug)]
pub struct Rng {
    seed: String,
    stream: ChaCha8Rng,
}

impl Rng {
    /// Build from the startup seed parameter; a missing parameter gets a
    /// freshly generated seed.
    pub fn new(seed: Option<&str>) -> Self {
        match seed {
            Some(s) => Self::from_seed(s),
            None => Self::from_entropy(),
        }
    }

    /// Build a deterministic generator for `seed`.
    pub fn from_seed(seed: &str) -> Self {
        tracing::info!(seed, "seeded rng (pass the seed back in to replay this sketch)");
        Self {
            seed: seed.to_owned(),
            stream: stream_for(seed),
        }
    }

    /// Build from a freshly generated seed.
    pub fn from_entropy() -> Self {
        let seed = generate_seed();
        Self::from_seed(&seed)
    }

    /// The active seed string.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Uniform draw in `[0, 1)` with 53 bits of precision.
    pub fn random(&mut self) -> f64 {
        let v = self.stream.next_u64() >> 11;
        (v as f64) * (1.0 / ((1u64 << 53) as f64))
    }

    /// Replace seed and generator in one step. `None` generates a fresh seed.
    ///
    /// The old generator state is discarded whole; no draw can observe a mix
    /// of old and new state.
    pub fn reseed(&mut self, seed: Option<&str>) {
        let next = match seed {
            Some(s) => Self::from_seed(s),
            None => Self::from_entropy(),
        };
        *self = next;
    }
}

fn stream_for(seed: &str) -> ChaCha8Rng {
    let mut hasher = Fnv1a64::new_default();
    hasher.write_bytes(seed.as_bytes());
    ChaCha8Rng::seed_from_u64(hasher.finish())
}

fn generate_seed() -> String {
    let mut bytes = [0u8; SEED_BYTE_LEN];
    if let Err(err) = rand::rngs::OsRng.try_fill_bytes(&mut bytes) {
        tracing::warn!("os entropy unavailable ({err}); deriving seed from the clock");
        fill_from_clock(&mut bytes);
    }
    bytes.iter().map(|b| to_hexadecimal(*b)).collect()
}

fn fill_from_clock(bytes: &mut [u8]) {
    let mut state = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    for chunk in bytes.chunks_mut(8) {
        let word = splitmix_next(&mut state).to_le_bytes();
        chunk.copy_from_slice(&word[..chunk.len()]);
    }
}

fn splitmix_next(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
