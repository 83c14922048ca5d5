// ============================================================
// Layer 4: Train/Validation Holdout
// ============================================================
// Used only when no separate validation folder exists: the
// training samples are shuffled with a seeded RNG and a fraction
// is held back for validation. Seeding keeps the holdout stable
// across runs so resumed training validates on the same images.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Holdout split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
