// ============================================================
// Layer 2: InspectUseCase
// ============================================================
// Builds a network from hyperparameters alone (no data, no
// checkpoint) and summarises it.

use anyhow::{ensure, Result};
use burn::prelude::*;

use crate::ml::{model::DenseNetConfig, trainer::shape_check, CpuBackend};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    /// Channels after the stem and after every block / transition
    pub feature_channels: Vec<usize>,
    pub num_params:       usize,
    pub output_shape:     [usize; 2],
}

pub struct InspectUseCase {
    model:    DenseNetConfig,
    img_size: usize,
}

impl InspectUseCase {
    pub fn new(model: DenseNetConfig, img_size: usize) -> Self {
        Self { model, img_size }
    }

    /// Always runs on the CPU backend.
    pub fn execute(&self) -> Result<ModelSummary> {
        let min_size = self.model.min_input_size();
        ensure!(
            self.img_size >= min_size,
            "Image size {} is too small for this network; it needs at least {}",
            self.img_size,
            min_size
        );

        let device = <CpuBackend as Backend>::Device::default();
        let model  = self.model.init::<CpuBackend>(&device);

        Ok(ModelSummary {
            feature_channels: self.model.feature_channels(),
            num_params:       model.num_params(),
            output_shape:     shape_check(&model, self.img_size, &device),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_small_network() {
        let cfg = DenseNetConfig::new(5)
            .with_initial_channels(4)
            .with_growth_rate(2)
            .with_block_sizes(vec![2, 2]);
        let summary = InspectUseCase::new(cfg, 32).execute().unwrap();

        assert_eq!(summary.feature_channels, vec![4, 8, 4, 8]);
        assert_eq!(summary.output_shape, [1, 5]);
        assert!(summary.num_params > 0);
    }

    #[test]
    fn test_input_smaller_than_network_is_an_error() {
        let err = InspectUseCase::new(DenseNetConfig::new(17), 16).execute().unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }
}
