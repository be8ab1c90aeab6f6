use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::data::sequences::Sequences;
use crate::layers::dense::{Dense, DenseCache};
use crate::layers::lstm::{LstmCache, LstmCell};
use crate::math::matrix::Matrix;
use crate::network::spec::NetworkSpec;

/// Sequence classifier: LSTM over the time axis, final hidden state through
/// a tanh bottleneck, then a linear layer producing one logit per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmClassifier {
    pub spec: NetworkSpec,
    pub lstm: LstmCell,
    pub middle: Dense,
    pub logits: Dense,
}

/// Everything the backward pass needs from one forward pass.
pub struct ForwardCache {
    lstm: LstmCache,
    middle: DenseCache,
    logits: DenseCache,
}

/// Parameter gradients, in the same order as
/// [`LstmClassifier::parameters_mut`].
pub type Gradients = Vec<Matrix>;

impl LstmClassifier {
    pub fn new<R: Rng + ?Sized>(spec: NetworkSpec, rng: &mut R) -> LstmClassifier {
        let lstm = LstmCell::new(spec.input_channels, spec.layer_dim, spec.forget_bias, rng);
        let middle = Dense::new(spec.layer_dim, spec.middle_size, ActivationFunction::Tanh, rng);
        let logits = Dense::new(spec.middle_size, spec.output_dim, ActivationFunction::Identity, rng);
        LstmClassifier { spec, lstm, middle, logits }
    }

    /// Logits (`batch × output_dim`) plus the activation cache.
    pub fn forward(&self, features: &Sequences) -> (Matrix, ForwardCache) {
        let steps = features.unstack();
        let (last_hidden, lstm) = self.lstm.forward(&steps);
        let (middle_out, middle) = self.middle.forward(&last_hidden);
        let (logits_out, logits) = self.logits.forward(&middle_out);
        (logits_out, ForwardCache { lstm, middle, logits })
    }

    /// Logits without keeping a cache.
    pub fn infer(&self, features: &Sequences) -> Matrix {
        let last_hidden = self.lstm.infer(&features.unstack());
        self.logits.infer(&self.middle.infer(&last_hidden))
    }

    /// Backpropagates ∂L/∂logits through every layer.
    pub fn backward(&self, grad_logits: &Matrix, cache: &ForwardCache) -> Gradients {
        let (logits_grads, grad_middle) = self.logits.backward(grad_logits, &cache.logits);
        let (middle_grads, grad_hidden) = self.middle.backward(&grad_middle, &cache.middle);
        let lstm_grads = self.lstm.backward(&grad_hidden, &cache.lstm);

        vec![
            lstm_grads.kernel,
            lstm_grads.bias,
            middle_grads.weights,
            middle_grads.biases,
            logits_grads.weights,
            logits_grads.biases,
        ]
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Matrix> {
        vec![
            &mut self.lstm.kernel,
            &mut self.lstm.bias,
            &mut self.middle.weights,
            &mut self.middle.biases,
            &mut self.logits.weights,
            &mut self.logits.biases,
        ]
    }

    pub fn parameter_count(&self) -> usize {
        [
            &self.lstm.kernel,
            &self.lstm.bias,
            &self.middle.weights,
            &self.middle.biases,
            &self.logits.weights,
            &self.logits.biases,
        ]
        .iter()
        .map(|m| m.data.len())
        .sum()
    }
}
