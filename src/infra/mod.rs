// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by the training and test flows:
//
//   checkpoint.rs - model weights (Burn CompactRecorder), the
//                   latest-epoch pointer and train_config.json
//                   so `test`/`predict` can rebuild the network.
//
//   metrics.rs    - per-epoch loss / validation accuracy CSV.
//
//   loss_plot.rs  - renders the training loss curve to PNG.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Training loss curve rendering
pub mod loss_plot;
