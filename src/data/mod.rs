// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything between the files on disk and the tensor batches
// the training loop consumes:
//
//   class-name file
//       │
//       ▼
//   load_class_names  → ordered ClassNames (label ids)
//       │
//       ▼
//   ImageFolder       → walks root/<class>/ and lists ImageSamples
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → decodes, resizes, normalises, stacks
//       │
//       ▼
//   DataLoader        → Burn worker threads feed batches to the loop
//
// Images are decoded inside the batcher so decoding runs on the
// DataLoader's worker threads, not on the training thread.

/// Reads and validates the class-name file
pub mod class_file;

/// Directory-per-class image folder scanner
pub mod image_folder;

/// Resize + ImageNet normalisation of decoded images
pub mod transform;

/// Implements Burn's Dataset trait for image samples
pub mod dataset;

/// Implements Burn's Batcher trait to create image batches
pub mod batcher;

/// Seeded train/validation holdout split
pub mod splitter;
