use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::data::input::InputFn;
use crate::data::sequences::Sequences;
use crate::error::{Error, Result};
use crate::estimator::checkpoint::{Checkpoint, CheckpointManager};
use crate::estimator::metrics::Accuracy;
use crate::estimator::model_fn::{model_fn, EstimatorSpec, ModeKey, Prediction};
use crate::network::metadata::ModelMetadata;
use crate::network::network::LstmClassifier;
use crate::network::spec::NetworkSpec;
use crate::optim::Optimizer;

/// Result of one `train` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub global_step: u64,
    /// Mean of the per-batch losses.
    pub mean_loss: f64,
    pub steps: u64,
}

/// Result of one `evaluate` call, also written to `eval_<name>.jsonl`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub accuracy: f64,
    /// Mean of the per-batch losses.
    pub loss: f64,
    pub global_step: u64,
}

/// Owns a classifier, its optimizer and its model directory, and runs
/// train / evaluate / predict passes over input pipelines.
pub struct Estimator {
    model: LstmClassifier,
    optimizer: Optimizer,
    metadata: ModelMetadata,
    global_step: u64,
    checkpoints: CheckpointManager,
    log_step_count_steps: u64,
    rng: StdRng,
}

impl Estimator {
    /// Opens `model_dir`, restoring the latest checkpoint when there is one.
    ///
    /// A restored checkpoint must describe the same architecture as
    /// `config` + `input_channels`, and its metadata must agree with
    /// `metadata` on labels, time steps and split; otherwise this fails
    /// rather than silently reinitialising or relabelling classes.
    pub fn new(
        model_dir: impl Into<PathBuf>,
        config: &Config,
        input_channels: usize,
        metadata: ModelMetadata,
    ) -> Result<Estimator> {
        config.validate()?;
        let model_dir = model_dir.into();
        std::fs::create_dir_all(&model_dir)?;
        let checkpoints = CheckpointManager::new(&model_dir, config.keep_checkpoint_max);
        let spec = NetworkSpec::from_config(config, input_channels);
        let mut rng = StdRng::seed_from_u64(config.seed);

        let (model, optimizer, global_step, metadata) = match checkpoints.latest()? {
            Some(ckpt) => {
                if ckpt.model.spec != spec {
                    return Err(Error::checkpoint(format!(
                        "checkpoint in {} was trained as {:?}, config asks for {:?}",
                        model_dir.display(), ckpt.model.spec, spec
                    )));
                }
                if let Some(diff) = ckpt.metadata.incompatibility(&metadata) {
                    return Err(Error::checkpoint(format!(
                        "checkpoint in {} was trained on different data ({})",
                        model_dir.display(), diff
                    )));
                }
                (ckpt.model, ckpt.optimizer, ckpt.global_step, ckpt.metadata)
            }
            None => {
                let model = LstmClassifier::new(spec, &mut rng);
                info!(
                    parameters = model.parameter_count(),
                    model_dir = %model_dir.display(),
                    "Initialised new model"
                );
                (model, config.optimizer.build(), 0, metadata)
            }
        };

        // Offset by the step so a resumed run does not replay the same
        // shuffle order.
        let rng = StdRng::seed_from_u64(config.seed.wrapping_add(global_step));

        Ok(Estimator {
            model,
            optimizer,
            metadata,
            global_step,
            checkpoints,
            log_step_count_steps: config.log_step_count_steps,
            rng,
        })
    }

    /// Opens an existing model directory for prediction only. Fails when no
    /// checkpoint is present.
    pub fn restore(model_dir: impl Into<PathBuf>) -> Result<Estimator> {
        let model_dir = model_dir.into();
        let checkpoints = CheckpointManager::new(&model_dir, 1);
        let ckpt = checkpoints.latest()?.ok_or_else(|| {
            Error::checkpoint(format!("no checkpoint found in {}", model_dir.display()))
        })?;
        Ok(Estimator {
            rng: StdRng::seed_from_u64(ckpt.global_step),
            model: ckpt.model,
            optimizer: ckpt.optimizer,
            metadata: ckpt.metadata,
            global_step: ckpt.global_step,
            checkpoints,
            log_step_count_steps: u64::MAX,
        })
    }

    pub fn model(&self) -> &LstmClassifier {
        &self.model
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    pub fn model_dir(&self) -> &Path {
        self.checkpoints.dir()
    }

    /// One optimizer step per batch of `input`, then a checkpoint.
    pub fn train(&mut self, input: InputFn<'_>) -> Result<TrainSummary> {
        let started = Instant::now();
        let mut total_loss = 0.0;
        let mut steps = 0u64;

        for batch in input.batches(&mut self.rng) {
            let spec = model_fn(
                &mut self.model,
                &mut self.optimizer,
                &batch.features,
                Some(batch.labels.as_slice()),
                ModeKey::Train,
            )?;
            let EstimatorSpec::Train { loss } = spec else {
                unreachable!("train mode yields a train spec")
            };

            self.global_step += 1;
            steps += 1;
            total_loss += loss;

            if self.global_step % self.log_step_count_steps == 0 || self.global_step == 1 {
                info!(loss, step = self.global_step, "training");
            } else {
                debug!(loss, step = self.global_step, batch = batch.labels.len(), "training");
            }
        }

        let mean_loss = if steps == 0 { 0.0 } else { total_loss / steps as f64 };
        self.save()?;
        info!(
            steps,
            mean_loss,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loss for final step"
        );
        Ok(TrainSummary { global_step: self.global_step, mean_loss, steps })
    }

    /// Streams `input` through the model and appends the result to
    /// `eval_<name>.jsonl` in the model directory.
    pub fn evaluate(&mut self, input: InputFn<'_>, name: &str) -> Result<EvalResult> {
        let mut accuracy = Accuracy::default();
        let mut total_loss = 0.0;
        let mut batches = 0usize;

        for batch in input.batches(&mut self.rng) {
            let spec = model_fn(
                &mut self.model,
                &mut self.optimizer,
                &batch.features,
                Some(batch.labels.as_slice()),
                ModeKey::Eval,
            )?;
            let EstimatorSpec::Eval { loss, accuracy: batch_accuracy } = spec else {
                unreachable!("eval mode yields an eval spec")
            };
            total_loss += loss;
            accuracy.merge(batch_accuracy);
            batches += 1;
        }

        let result = EvalResult {
            accuracy: accuracy.value(),
            loss: if batches == 0 { 0.0 } else { total_loss / batches as f64 },
            global_step: self.global_step,
        };
        self.write_eval_summary(name, &result)?;
        info!(
            eval = name,
            accuracy = result.accuracy,
            loss = result.loss,
            global_step = result.global_step,
            "Saving dict for global step"
        );
        Ok(result)
    }

    /// Class predictions for every sample in `features`.
    pub fn predict(&mut self, features: &Sequences) -> Result<Vec<Prediction>> {
        match model_fn(&mut self.model, &mut self.optimizer, features, None, ModeKey::Predict)? {
            EstimatorSpec::Predict { predictions } => Ok(predictions),
            _ => unreachable!("predict mode yields predictions"),
        }
    }

    fn save(&self) -> Result<PathBuf> {
        let checkpoint = Checkpoint {
            global_step: self.global_step,
            model: self.model.clone(),
            optimizer: self.optimizer.clone(),
            metadata: self.metadata.clone(),
        };
        self.checkpoints.save(&checkpoint)
    }

    fn write_eval_summary(&self, name: &str, result: &EvalResult) -> Result<()> {
        let path = self.checkpoints.dir().join(format!("eval_{}.jsonl", name));
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        serde_json::to_writer(&mut file, result)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::input::input_fn;
    use crate::data::labels::LabelEncoder;

    fn config() -> Config {
        Config {
            layer_dim: 6,
            output_dim: 2,
            middle_size: 4,
            batch_size: 3,
            num_epochs: 1,
            ..Config::default()
        }
    }

    fn data() -> (Sequences, Vec<usize>) {
        // class 0: rising ramps, class 1: falling ramps
        let mut values = Vec::new();
        let mut labels = Vec::new();
        for i in 0..8 {
            let class = i % 2;
            for t in 0..5 {
                let v = t as f64 / 5.0;
                values.push(if class == 0 { v } else { 1.0 - v });
            }
            labels.push(class);
        }
        (Sequences::new(8, 5, 1, values).unwrap(), labels)
    }

    #[test]
    fn train_writes_checkpoint_and_counts_steps() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();
        let (x, y) = data();
        let mut est = Estimator::new(dir.path(), &cfg, 1, ModelMetadata::default()).unwrap();

        let summary = est.train(input_fn(&x, &y, &cfg)).unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.global_step, 3);
        assert!(dir.path().join("model.ckpt-3.json").exists());
        assert!(dir.path().join("checkpoint.json").exists());
    }

    #[test]
    fn evaluate_logs_bounded_accuracy() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();
        let (x, y) = data();
        let mut est = Estimator::new(dir.path(), &cfg, 1, ModelMetadata::default()).unwrap();

        let result = est.evaluate(input_fn(&x, &y, &cfg), "validation").unwrap();
        assert!((0.0..=1.0).contains(&result.accuracy));
        assert_eq!(result.global_step, 0);

        let log = std::fs::read_to_string(dir.path().join("eval_validation.jsonl")).unwrap();
        let logged: EvalResult = serde_json::from_str(log.trim()).unwrap();
        assert_eq!(logged, result);
    }

    #[test]
    fn new_estimator_resumes_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();
        let (x, y) = data();
        {
            let mut est = Estimator::new(dir.path(), &cfg, 1, ModelMetadata::default()).unwrap();
            est.train(input_fn(&x, &y, &cfg)).unwrap();
        }
        let resumed = Estimator::new(dir.path(), &cfg, 1, ModelMetadata::default()).unwrap();
        assert_eq!(resumed.global_step(), 3);

        let restored = Estimator::restore(dir.path()).unwrap();
        assert_eq!(restored.model().lstm.kernel, resumed.model().lstm.kernel);
    }

    #[test]
    fn mismatched_architecture_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();
        let (x, y) = data();
        let mut est = Estimator::new(dir.path(), &cfg, 1, ModelMetadata::default()).unwrap();
        est.train(input_fn(&x, &y, &cfg)).unwrap();

        let wider = Config { layer_dim: 7, ..config() };
        assert!(matches!(
            Estimator::new(dir.path(), &wider, 1, ModelMetadata::default()),
            Err(Error::Checkpoint(_))
        ));
    }

    #[test]
    fn resume_with_different_labels_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config { output_dim: 3, ..config() };
        let (x, y) = data();
        let trained_on = ModelMetadata {
            time_steps: 5,
            labels: LabelEncoder::fit(["run", "walk"]),
            ..ModelMetadata::default()
        };
        let mut est = Estimator::new(dir.path(), &cfg, 1, trained_on.clone()).unwrap();
        est.train(input_fn(&x, &y, &cfg)).unwrap();

        // "jump" would shift every class id by one
        let relabelled = ModelMetadata {
            labels: LabelEncoder::fit(["jump", "run", "walk"]),
            ..trained_on.clone()
        };
        assert!(matches!(
            Estimator::new(dir.path(), &cfg, 1, relabelled),
            Err(Error::Checkpoint(_))
        ));
        let shorter = ModelMetadata { time_steps: 4, ..trained_on.clone() };
        assert!(matches!(
            Estimator::new(dir.path(), &cfg, 1, shorter),
            Err(Error::Checkpoint(_))
        ));

        let resumed = Estimator::new(dir.path(), &cfg, 1, trained_on).unwrap();
        assert_eq!(resumed.metadata().label_name(0), Some("run"));
    }

    #[test]
    fn restore_without_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Estimator::restore(dir.path()), Err(Error::Checkpoint(_))));
    }

    #[test]
    fn predict_covers_every_sample() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();
        let (x, _) = data();
        let mut est = Estimator::new(dir.path(), &cfg, 1, ModelMetadata::default()).unwrap();
        let predictions = est.predict(&x).unwrap();
        assert_eq!(predictions.len(), 8);
        assert!(predictions.iter().all(|p| p.class_id < 2));
    }
}
