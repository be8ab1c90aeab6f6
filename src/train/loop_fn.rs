use std::time::Instant;

use tracing::info;

use crate::config::Config;
use crate::data::dataset::Dataset;
use crate::data::input::input_fn;
use crate::error::Result;
use crate::estimator::Estimator;
use crate::train::epoch_stats::EpochStats;

/// Name under which held-out results are logged.
pub const VALIDATION: &str = "validation";

/// Runs `config.num_epochs` rounds of one training pass over `train`
/// followed by one evaluation pass over `test`.
///
/// `on_epoch` receives the stats of every completed epoch. The first error
/// from training or evaluation aborts the loop and is returned as is.
pub fn run_epochs<F>(
    estimator: &mut Estimator,
    train: &Dataset,
    test: &Dataset,
    config: &Config,
    mut on_epoch: F,
) -> Result<Vec<EpochStats>>
where
    F: FnMut(&EpochStats),
{
    let mut history = Vec::with_capacity(config.num_epochs);

    for epoch in 1..=config.num_epochs {
        let t_start = Instant::now();

        // ── One full pass over the training data ───────────────────────────
        let summary = estimator.train(input_fn(&train.features, &train.labels, config))?;

        // ── Validation ────────────────────────────────────────────────────
        let eval = estimator.evaluate(input_fn(&test.features, &test.labels, config), VALIDATION)?;

        let stats = EpochStats {
            epoch,
            total_epochs: config.num_epochs,
            train_loss: summary.mean_loss,
            val_loss: eval.loss,
            val_accuracy: eval.accuracy,
            global_step: eval.global_step,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        info!(
            epoch,
            total = config.num_epochs,
            train_loss = stats.train_loss,
            val_loss = stats.val_loss,
            val_accuracy = stats.val_accuracy,
            "epoch finished"
        );

        on_epoch(&stats);
        history.push(stats);
    }

    Ok(history)
}
