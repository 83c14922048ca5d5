// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// All Burn network and training code lives here.
//
//   model.rs      - DenseNet: ConvBlock, DenseBlock,
//                   TransitionBlock and the classifier
//
//   trainer.rs    - train loop: forward, loss, backward, Adam
//                   step, periodic validation, checkpoints,
//                   final test pass
//
//   evaluator.rs  - loss / accuracy / per-class accuracy over
//                   a DataLoader
//
//   inferencer.rs - single-image prediction from a checkpoint
//
// Reference: Huang et al. (2017) Densely Connected Convolutional Networks
//            Burn Book §5 (Training)

/// Backend used when a GPU is requested
pub type GpuBackend = burn::backend::Wgpu;

/// Backend used with `--cpu`
pub type CpuBackend = burn::backend::NdArray;

/// DenseNet architecture
pub mod model;

/// Training loop with validation, test and checkpointing
pub mod trainer;

/// Loss and accuracy over a data loader
pub mod evaluator;

/// Loads a checkpoint and classifies single images
pub mod inferencer;
