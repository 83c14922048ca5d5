// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The application layer asks a SampleSource for labelled images
// without knowing how they are stored on disk.

use anyhow::Result;

use crate::domain::class_names::ClassNames;
use crate::domain::sample::ImageSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can enumerate labelled image samples.
///
/// Implementations:
///   - ImageFolder → directory-per-class layout
pub trait SampleSource {
    /// Enumerate all samples whose class appears in `classes`.
    /// Labels are the class indices in `classes`.
    fn load_samples(&self, classes: &ClassNames) -> Result<Vec<ImageSample>>;
}
