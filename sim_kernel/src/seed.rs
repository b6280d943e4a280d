//! Stable seed forking for deterministic replay.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use world_model::Seed;

use crate::error::{KernelError, Result};

/// Number of digest bytes folded into a forked seed.
pub const SEED_BYTES: usize = 8;

/// Derives independent, reproducible seeds for each subsystem from one global seed.
///
/// A fork is `SHA-256("{global_seed}:{label}")`, first eight bytes read big-endian.
/// The same `(global_seed, label)` pair yields the same value in every process,
/// so subsystems never need to share an RNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedManager {
    global_seed: Seed,
}

impl SeedManager {
    /// Create a manager for one run's global seed.
    pub fn new(global_seed: Seed) -> Self {
        Self { global_seed }
    }

    /// Seed every fork derives from.
    pub fn global_seed(&self) -> Seed {
        self.global_seed
    }

    /// Derive the seed for `label`.
    pub fn fork(&self, label: &str) -> Result<Seed> {
        if label.is_empty() {
            return Err(KernelError::InvalidArgument(
                "label must not be empty".to_string(),
            ));
        }

        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", self.global_seed, label).as_bytes());
        let digest = hasher.finalize();

        let mut prefix = [0u8; SEED_BYTES];
        prefix.copy_from_slice(&digest[..SEED_BYTES]);
        let seed = u64::from_be_bytes(prefix);

        tracing::trace!(global_seed = self.global_seed, label, seed, "seed forked");
        Ok(seed)
    }

    /// A fresh generator seeded with `fork(label)`.
    pub fn rng(&self, label: &str) -> Result<ChaCha8Rng> {
        Ok(ChaCha8Rng::seed_from_u64(self.fork(label)?))
    }
}
