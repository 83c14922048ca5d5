// ============================================================
// Layer 5: Evaluator
// ============================================================
// Runs an inference-mode model over a DataLoader and reports:
//
//   loss      - mean cross-entropy per batch
//   accuracy  - matches / samples
//   per class - class_match[c] / class_counter[c]
//
// Used for periodic validation during training and for the
// final test report. The model must be on a non-autodiff
// backend (model.valid()), so batch-norm uses running stats.
//
// Prediction = argmax over logits; argmax of softmax(logits)
// picks the same class.

use burn::{
    data::dataloader::DataLoader,
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
};

use crate::data::batcher::ImageBatch;
use crate::domain::class_names::ClassNames;
use crate::ml::model::DenseNet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassTally {
    pub matched: usize,
    pub total:   usize,
}

impl ClassTally {
    /// None when the class had no samples
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.matched as f64 / self.total as f64)
    }
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub loss:      f64,
    pub matched:   usize,
    pub samples:   usize,
    pub per_class: Vec<ClassTally>,
}

impl EvaluationReport {
    pub fn accuracy(&self) -> f64 {
        if self.samples > 0 { self.matched as f64 / self.samples as f64 } else { 0.0 }
    }

    /// Per-class lines followed by the loss and overall accuracy.
    pub fn render(&self, classes: &ClassNames) -> String {
        let mut out = String::from("Test accuracy ==========\n");
        for (label, tally) in self.per_class.iter().enumerate() {
            let name = classes.name(label).unwrap_or("?");
            match tally.accuracy() {
                Some(acc) => out.push_str(&format!("{name}: {acc:.4}\n")),
                None      => out.push_str(&format!("{name}: n/a\n")),
            }
        }
        out.push_str(&format!("\nTest loss: {:.6}", self.loss));
        out.push_str(&format!("\nTest accuracy: {:.4}", self.accuracy()));
        out
    }
}

/// Running totals while iterating batches.
#[derive(Debug, Clone)]
pub struct EvaluationAccumulator {
    loss_sum:  f64,
    batches:   usize,
    matched:   usize,
    samples:   usize,
    per_class: Vec<ClassTally>,
}

impl EvaluationAccumulator {
    pub fn new(num_classes: usize) -> Self {
        Self {
            loss_sum:  0.0,
            batches:   0,
            matched:   0,
            samples:   0,
            per_class: vec![ClassTally::default(); num_classes],
        }
    }

    pub fn record(&mut self, batch_loss: f64, predictions: &[usize], answers: &[usize]) {
        self.loss_sum += batch_loss;
        self.batches  += 1;

        for (&response, &answer) in predictions.iter().zip(answers) {
            self.samples += 1;
            let hit = response == answer;
            if hit {
                self.matched += 1;
            }
            if let Some(tally) = self.per_class.get_mut(answer) {
                tally.total += 1;
                if hit {
                    tally.matched += 1;
                }
            }
        }
    }

    pub fn finish(self) -> EvaluationReport {
        let loss = if self.batches > 0 { self.loss_sum / self.batches as f64 } else { f64::NAN };
        EvaluationReport {
            loss,
            matched:   self.matched,
            samples:   self.samples,
            per_class: self.per_class,
        }
    }
}

fn to_indices<B: Backend>(t: Tensor<B, 1, Int>) -> Vec<usize> {
    t.into_data().iter::<i64>().map(|v| v as usize).collect()
}

/// Evaluate `model` over every batch of `loader`.
pub fn evaluate<B: Backend>(
    model:       &DenseNet<B>,
    loader:      &dyn DataLoader<ImageBatch<B>>,
    num_classes: usize,
    verbose:     bool,
) -> EvaluationReport {
    let mut acc   = EvaluationAccumulator::new(num_classes);
    let mut first = true;

    for batch in loader.iter() {
        if first && verbose {
            tracing::info!("labels: {:?}", to_indices(batch.labels.clone()));
            tracing::info!("images: {:?}", batch.paths);
            first = false;
        }

        let logits = model.forward(batch.images);
        let ce     = CrossEntropyLossConfig::new().init(&logits.device());
        let loss: f64 = ce
            .forward(logits.clone(), batch.labels.clone())
            .into_scalar()
            .elem::<f64>();

        // argmax(1) returns [batch, 1]; flatten to [batch]
        let predictions = to_indices(logits.argmax(1).flatten::<1>(0, 1));
        let answers     = to_indices(batch.labels);
        acc.record(loss, &predictions, &answers);
    }

    acc.finish()
}
