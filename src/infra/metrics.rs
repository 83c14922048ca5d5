// ============================================================
// Layer 6: Metrics Logger
// ============================================================
// Records one CSV row per training epoch:
//
//   epoch,train_loss,val_loss,val_accuracy
//   1,2.803114,,
//   ...
//   5,1.902377,1.874410,0.411765
//
// Validation only runs every few epochs, so the validation
// columns are left empty on the other rows. The loss curve is
// drawn from this file, which lets a resumed run plot its
// whole history.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

const HEADER: [&str; 4] = ["epoch", "train_loss", "val_loss", "val_accuracy"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,

    /// Average loss over the epoch's training batches
    pub train_loss: f64,

    /// Average validation loss, on validation epochs only
    pub val_loss: Option<f64>,

    /// Validation accuracy in [0, 1], on validation epochs only
    pub val_accuracy: Option<f64>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64) -> Self {
        Self { epoch, train_loss, val_loss: None, val_accuracy: None }
    }

    pub fn with_validation(mut self, loss: f64, accuracy: f64) -> Self {
        self.val_loss     = Some(loss);
        self.val_accuracy = Some(accuracy);
        self
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open `dir/metrics.csv`. With `append = false` any previous
    /// log is replaced; otherwise rows are added after it.
    pub fn new(dir: impl AsRef<Path>, append: bool) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");

        if !append || !csv_path.exists() {
            let mut writer = csv::Writer::from_path(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writer.write_record(HEADER)?;
            writer.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        // Header was written when the file was created
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(m)?;
        writer.flush()?;

        tracing::debug!("Logged epoch {} metrics: train_loss={:.4}", m.epoch, m.train_loss);
        Ok(())
    }

    /// All rows logged so far, in file order. Malformed rows are skipped.
    pub fn read_all(&self) -> Result<Vec<EpochMetrics>> {
        let mut reader = csv::Reader::from_path(&self.csv_path)
            .with_context(|| format!("Cannot read '{}'", self.csv_path.display()))?;

        let mut rows = Vec::new();
        for row in reader.deserialize::<EpochMetrics>() {
            match row {
                Ok(m)  => rows.push(m),
                Err(e) => tracing::warn!("Skipping metrics row: {}", e),
            }
        }
        Ok(rows)
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_round_trip_with_empty_validation() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), false).unwrap();

        logger.log(&EpochMetrics::new(1, 2.5)).unwrap();
        logger.log(&EpochMetrics::new(2, 2.0).with_validation(1.9, 0.25)).unwrap();

        let rows = logger.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].val_loss, None);
        assert_eq!(rows[1].epoch, 2);
        assert_eq!(rows[1].val_accuracy, Some(0.25));

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert!(text.starts_with("epoch,train_loss,val_loss,val_accuracy\n"));
        assert!(text.contains("\n1,2.5,,\n"));
    }

    #[test]
    fn test_append_keeps_history_and_fresh_truncates() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path(), false).unwrap()
            .log(&EpochMetrics::new(1, 3.0)).unwrap();

        let resumed = MetricsLogger::new(dir.path(), true).unwrap();
        resumed.log(&EpochMetrics::new(2, 2.0)).unwrap();
        assert_eq!(resumed.read_all().unwrap().len(), 2);

        let fresh = MetricsLogger::new(dir.path(), false).unwrap();
        assert!(fresh.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_nan_loss_survives_the_file() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), false).unwrap();
        logger.log(&EpochMetrics::new(1, f64::NAN)).unwrap();

        let rows = logger.read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].train_loss.is_nan());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), false).unwrap();
        logger.log(&EpochMetrics::new(1, 1.0)).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(logger.csv_path())
            .and_then(|mut f| std::io::Write::write_all(&mut f, b"oops,not,a,row\n"))
            .unwrap();
        logger.log(&EpochMetrics::new(2, 0.5)).unwrap();

        let epochs: Vec<usize> = logger.read_all().unwrap().iter().map(|m| m.epoch).collect();
        assert_eq!(epochs, vec![1, 2]);
    }
}
