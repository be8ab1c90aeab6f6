use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Adam with bias correction folded into the step size:
///
/// ```text
/// lr_t = lr · sqrt(1 - β2^t) / (1 - β1^t)
/// m    = β1·m + (1 - β1)·g
/// v    = β2·v + (1 - β2)·g²
/// θ    = θ - lr_t · m / (sqrt(v) + ε)
/// ```
///
/// Moment slots are created lazily on the first step, one pair per parameter
/// in the order the model hands them over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// Number of updates applied so far.
    pub iterations: u64,
    first_moments: Vec<Matrix>,
    second_moments: Vec<Matrix>,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Adam {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            iterations: 0,
            first_moments: Vec::new(),
            second_moments: Vec::new(),
        }
    }

    pub fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) {
        if self.first_moments.len() != grads.len() {
            self.first_moments = grads.iter().map(|g| Matrix::zeros(g.rows, g.cols)).collect();
            self.second_moments = self.first_moments.clone();
        }

        self.iterations += 1;
        let t = self.iterations as i32;
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));

        for (((param, grad), m), v) in params.into_iter()
            .zip(grads)
            .zip(self.first_moments.iter_mut())
            .zip(self.second_moments.iter_mut())
        {
            for i in 0..param.data.len() {
                let g = grad.data[i];
                m.data[i] = self.beta1 * m.data[i] + (1.0 - self.beta1) * g;
                v.data[i] = self.beta2 * v.data[i] + (1.0 - self.beta2) * g * g;
                param.data[i] -= lr_t * m.data[i] / (v.data[i].sqrt() + self.epsilon);
            }
        }
    }
}

impl Default for Adam {
    fn default() -> Self {
        Adam::new(0.001, 0.9, 0.999, 1e-8)
    }
}
