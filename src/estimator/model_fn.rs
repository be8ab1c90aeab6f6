use serde::{Serialize, Deserialize};

use crate::activation::activation::{argmax, softmax};
use crate::data::sequences::Sequences;
use crate::error::{Error, Result};
use crate::estimator::metrics::Accuracy;
use crate::loss::cross_entropy::SparseSoftmaxCrossEntropy;
use crate::math::matrix::Matrix;
use crate::network::network::LstmClassifier;
use crate::optim::Optimizer;

/// Which graph the model function builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKey {
    Predict,
    Eval,
    Train,
}

/// Output for one sample in predict mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_id: usize,
    pub probabilities: Vec<f64>,
    pub logits: Vec<f64>,
}

/// What the model function produced for the requested mode.
#[derive(Debug, Clone)]
pub enum EstimatorSpec {
    Predict { predictions: Vec<Prediction> },
    Eval { loss: f64, accuracy: Accuracy },
    /// Parameters have already been updated when this is returned.
    Train { loss: f64 },
}

/// Builds the classifier computation for `mode` over one batch.
///
/// - `Predict`: argmax class and softmax distribution per sample. `labels`
///   are ignored.
/// - `Eval`: mean sparse softmax cross-entropy and accuracy. No update.
/// - `Train`: the same loss, then one `optimizer` step over every parameter.
pub fn model_fn(
    model: &mut LstmClassifier,
    optimizer: &mut Optimizer,
    features: &Sequences,
    labels: Option<&[usize]>,
    mode: ModeKey,
) -> Result<EstimatorSpec> {
    check_features(model, features)?;

    if mode == ModeKey::Predict {
        let logits = model.infer(features);
        return Ok(EstimatorSpec::Predict { predictions: predictions(&logits) });
    }

    let labels = labels.ok_or(Error::MissingLabels(mode))?;
    check_labels(model, features, labels)?;

    match mode {
        ModeKey::Eval => {
            let logits = model.infer(features);
            let loss = SparseSoftmaxCrossEntropy::loss(&logits, labels);
            let mut accuracy = Accuracy::default();
            accuracy.update(&predicted_classes(&logits), labels);
            Ok(EstimatorSpec::Eval { loss, accuracy })
        }
        ModeKey::Train => {
            let (logits, cache) = model.forward(features);
            let loss = SparseSoftmaxCrossEntropy::loss(&logits, labels);
            let grad_logits = SparseSoftmaxCrossEntropy::derivative(&logits, labels);
            let grads = model.backward(&grad_logits, &cache);
            optimizer.step(model.parameters_mut(), &grads);
            Ok(EstimatorSpec::Train { loss })
        }
        ModeKey::Predict => unreachable!("predict returns early"),
    }
}

fn check_features(model: &LstmClassifier, features: &Sequences) -> Result<()> {
    if features.channels() != model.spec.input_channels {
        return Err(Error::shape(format!(
            "model expects {} channels per step, got {}",
            model.spec.input_channels,
            features.channels()
        )));
    }
    if features.time_steps() == 0 {
        return Err(Error::shape("sequences have no time steps"));
    }
    Ok(())
}

fn check_labels(model: &LstmClassifier, features: &Sequences, labels: &[usize]) -> Result<()> {
    if labels.len() != features.len() {
        return Err(Error::shape(format!(
            "{} sequences but {} labels", features.len(), labels.len()
        )));
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= model.spec.output_dim) {
        return Err(Error::shape(format!(
            "label {} is out of range for {} classes", bad, model.spec.output_dim
        )));
    }
    Ok(())
}

fn predicted_classes(logits: &Matrix) -> Vec<usize> {
    (0..logits.rows).map(|r| argmax(logits.row(r))).collect()
}

fn predictions(logits: &Matrix) -> Vec<Prediction> {
    (0..logits.rows)
        .map(|r| {
            let row = logits.row(r);
            Prediction {
                class_id: argmax(row),
                probabilities: softmax(row),
                logits: row.to_vec(),
            }
        })
        .collect()
}
