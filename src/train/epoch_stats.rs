use serde::{Serialize, Deserialize};

/// Per-epoch statistics produced by `run_epochs`, one value per completed
/// epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean of the per-batch training losses in this epoch.
    pub train_loss: f64,
    /// Mean held-out loss after the epoch.
    pub val_loss: f64,
    /// Held-out accuracy as a fraction in [0, 1].
    pub val_accuracy: f64,
    /// Optimizer steps taken so far, across resumed runs too.
    pub global_step: u64,
    /// Wall-clock duration of train + evaluate in milliseconds.
    pub elapsed_ms: u64,
}
