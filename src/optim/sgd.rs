use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Plain gradient descent: `θ ← θ - lr · g`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies one update to each parameter given its pre-computed gradient.
    pub fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) {
        for (param, grad) in params.into_iter().zip(grads) {
            for (p, g) in param.data.iter_mut().zip(&grad.data) {
                *p -= self.learning_rate * g;
            }
        }
    }
}
