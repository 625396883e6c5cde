//! Seeded random source shared by every shuffle of a run.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random generator threaded through a whole run.
pub type GroupingRng = ChaCha8Rng;

/// Creates the run generator from a seed.
///
/// The same seed reproduces the same partition bit for bit.
pub fn create_rng(seed: u64) -> GroupingRng {
    ChaCha8Rng::seed_from_u64(seed)
}
