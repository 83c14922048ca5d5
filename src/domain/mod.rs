// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust types describing what the classifier works with:
// the ordered list of class names, one labelled image on disk,
// and the abstractions the data layer implements.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums, errors and traits

/// Ordered class names parsed from the class-name file
pub mod class_names;

/// One labelled image sample on disk
pub mod sample;

/// Core abstractions (traits) implemented by the data layer
pub mod traits;
