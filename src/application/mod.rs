// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Orchestrates the other layers for one command each.
//
// Rules for this layer:
//   - No model code here (Layer 5)
//   - No argument parsing or printing here (Layer 1)
//   - File access only through Layers 4 and 6
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Train, validate, test and plot
pub mod train_use_case;

// Evaluate a saved checkpoint on the test folder
pub mod test_use_case;

// Classify a single image
pub mod predict_use_case;

// Summarise a network without data
pub mod inspect_use_case;
