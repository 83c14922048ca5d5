// ============================================================
// Layer 3: Image Sample Domain Type
// ============================================================
// A single labelled image found in a class folder. Pixels are
// not held here; they are decoded lazily by the batcher so a
// dataset of thousands of images stays cheap to clone.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path of the image file
    pub path: PathBuf,

    /// Index into the class-name list
    pub label: usize,
}

impl ImageSample {
    pub fn new(path: impl Into<PathBuf>, label: usize) -> Self {
        Self { path: path.into(), label }
    }
}
