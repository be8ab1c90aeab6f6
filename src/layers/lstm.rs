use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::sigmoid;
use crate::math::matrix::Matrix;

/// Basic LSTM cell, statically unrolled over a sequence.
///
/// One kernel maps the concatenation `[x_t, h_{t-1}]` to the four gate
/// pre-activations laid out as `i | j | f | o`:
///
/// ```text
/// c_t = c_{t-1} ⊙ σ(f + forget_bias) + σ(i) ⊙ tanh(j)
/// h_t = tanh(c_t) ⊙ σ(o)
/// ```
///
/// The state starts at zero for every sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    pub input_size: usize,
    pub units: usize,
    pub forget_bias: f64,
    /// `(input_size + units) × 4·units`
    pub kernel: Matrix,
    /// `1 × 4·units`
    pub bias: Matrix,
}

/// Per-step activations kept for backpropagation through time.
#[derive(Debug, Clone)]
struct StepCache {
    concat: Matrix,
    input_gate: Matrix,
    candidate: Matrix,
    forget_gate: Matrix,
    output_gate: Matrix,
    c_prev: Matrix,
    tanh_c: Matrix,
}

#[derive(Debug, Clone)]
pub struct LstmCache {
    steps: Vec<StepCache>,
}

#[derive(Debug, Clone)]
pub struct LstmGrads {
    pub kernel: Matrix,
    pub bias: Matrix,
}

impl LstmCell {
    pub fn new<R: Rng + ?Sized>(input_size: usize, units: usize, forget_bias: f64, rng: &mut R) -> LstmCell {
        LstmCell {
            input_size,
            units,
            forget_bias,
            kernel: Matrix::glorot_uniform(input_size + units, 4 * units, rng),
            bias: Matrix::zeros(1, 4 * units),
        }
    }

    /// Runs the cell over `steps` (each `batch × input_size`) and returns the
    /// final hidden state `batch × units` together with the BPTT cache.
    pub fn forward(&self, steps: &[Matrix]) -> (Matrix, LstmCache) {
        let batch = steps.first().map_or(0, |s| s.rows);
        let mut h = Matrix::zeros(batch, self.units);
        let mut c = Matrix::zeros(batch, self.units);
        let mut cache = LstmCache { steps: Vec::with_capacity(steps.len()) };

        for x in steps {
            let concat = x.hconcat(&h);
            let z = (&concat * &self.kernel).add_row(&self.bias);

            let n = self.units;
            let input_gate = z.columns(0, n).map(sigmoid);
            let candidate = z.columns(n, n).map(f64::tanh);
            let forget_bias = self.forget_bias;
            let forget_gate = z.columns(2 * n, n).map(|v| sigmoid(v + forget_bias));
            let output_gate = z.columns(3 * n, n).map(sigmoid);

            let c_new = &c.hadamard(&forget_gate) + &input_gate.hadamard(&candidate);
            let tanh_c = c_new.map(f64::tanh);
            h = tanh_c.hadamard(&output_gate);

            cache.steps.push(StepCache {
                concat,
                input_gate,
                candidate,
                forget_gate,
                output_gate,
                c_prev: c,
                tanh_c,
            });
            c = c_new;
        }

        (h, cache)
    }

    /// Final hidden state only.
    pub fn infer(&self, steps: &[Matrix]) -> Matrix {
        self.forward(steps).0
    }

    /// Backpropagation through time from ∂L/∂h_T. The loss only depends on
    /// the last hidden state, so no other step receives an outside gradient.
    pub fn backward(&self, grad_h_last: &Matrix, cache: &LstmCache) -> LstmGrads {
        let n = self.units;
        let mut grads = LstmGrads {
            kernel: Matrix::zeros(self.kernel.rows, self.kernel.cols),
            bias: Matrix::zeros(1, self.bias.cols),
        };
        let mut dh = grad_h_last.clone();
        let mut dc = Matrix::zeros(grad_h_last.rows, n);

        for step in cache.steps.iter().rev() {
            let d_output = dh.hadamard(&step.tanh_c);
            let d_tanh = step.tanh_c.map(|t| 1.0 - t * t);
            dc.add_assign(&dh.hadamard(&step.output_gate).hadamard(&d_tanh));

            let d_input = dc.hadamard(&step.candidate);
            let d_candidate = dc.hadamard(&step.input_gate);
            let d_forget = dc.hadamard(&step.c_prev);

            // Back through the gate nonlinearities.
            let dz_i = d_input.hadamard(&step.input_gate.map(|s| s * (1.0 - s)));
            let dz_j = d_candidate.hadamard(&step.candidate.map(|t| 1.0 - t * t));
            let dz_f = d_forget.hadamard(&step.forget_gate.map(|s| s * (1.0 - s)));
            let dz_o = d_output.hadamard(&step.output_gate.map(|s| s * (1.0 - s)));
            let dz = Matrix::hstack(&[&dz_i, &dz_j, &dz_f, &dz_o]);

            grads.kernel.add_assign(&(&step.concat.transpose() * &dz));
            grads.bias.add_assign(&dz.sum_rows());

            let d_concat = &dz * &self.kernel.transpose();
            dh = d_concat.columns(self.input_size, n);
            dc = dc.hadamard(&step.forget_gate);
        }

        grads
    }
}
