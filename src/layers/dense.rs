use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully connected layer: `a = act(x · W + b)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction,
}

/// Values from a forward pass that the backward pass needs.
#[derive(Debug, Clone)]
pub struct DenseCache {
    inputs: Matrix,
    pre_activation: Matrix,  // z = xW + b, needed for the derivative
}

/// Gradients for one dense layer, shaped like its parameters.
#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weights: Matrix,
    pub biases: Matrix,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(input_size: usize, size: usize, activation: ActivationFunction, rng: &mut R) -> Dense {
        Dense {
            weights: Matrix::glorot_uniform(input_size, size, rng),
            biases: Matrix::zeros(1, size),
            activator: activation,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn size(&self) -> usize {
        self.weights.cols
    }

    /// Batch forward pass. `inputs` is `batch × input_size`.
    pub fn forward(&self, inputs: &Matrix) -> (Matrix, DenseCache) {
        let z = (inputs * &self.weights).add_row(&self.biases);
        let a = z.map(|x| self.activator.function(x));
        (a, DenseCache { inputs: inputs.clone(), pre_activation: z })
    }

    /// Forward pass without keeping a cache.
    pub fn infer(&self, inputs: &Matrix) -> Matrix {
        (inputs * &self.weights).add_row(&self.biases).map(|x| self.activator.function(x))
    }

    /// `grad_output` is ∂L/∂a for this layer. Returns the parameter gradients
    /// and ∂L/∂x for the layer below.
    pub fn backward(&self, grad_output: &Matrix, cache: &DenseCache) -> (DenseGrads, Matrix) {
        let act_derivative = cache.pre_activation.map(|x| self.activator.derivative(x));
        // δ = error ⊙ σ'(z)
        let delta = grad_output.hadamard(&act_derivative);

        let grads = DenseGrads {
            weights: &cache.inputs.transpose() * &delta,
            biases: delta.sum_rows(),
        };
        let grad_input = &delta * &self.weights.transpose();

        (grads, grad_input)
    }
}
