use crate::activation::activation::softmax;
use crate::math::matrix::Matrix;

/// Sparse softmax cross-entropy computed directly from logits.
///
/// Labels are integer class indices rather than one-hot rows, and the loss is
/// the mean over the batch.
pub struct SparseSoftmaxCrossEntropy;

impl SparseSoftmaxCrossEntropy {
    /// Mean over rows of `logsumexp(z) - z[label]`.
    ///
    /// `logits`: `batch × n_classes`
    /// `labels`: one class index per row, each `< n_classes`
    pub fn loss(logits: &Matrix, labels: &[usize]) -> f64 {
        debug_assert_eq!(logits.rows, labels.len());
        if labels.is_empty() {
            return 0.0;
        }
        let total: f64 = labels.iter().enumerate()
            .map(|(r, &label)| {
                let row = logits.row(r);
                let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let log_sum_exp = max + row.iter().map(|z| (z - max).exp()).sum::<f64>().ln();
                log_sum_exp - row[label]
            })
            .sum();
        total / labels.len() as f64
    }

    /// Gradient of the mean loss w.r.t. the logits:
    ///   ∂L/∂z = (softmax(z) - onehot(label)) / batch
    pub fn derivative(logits: &Matrix, labels: &[usize]) -> Matrix {
        debug_assert_eq!(logits.rows, labels.len());
        let inv_batch = 1.0 / labels.len().max(1) as f64;
        let mut grad = Matrix::zeros(logits.rows, logits.cols);
        for (r, &label) in labels.iter().enumerate() {
            let probs = softmax(logits.row(r));
            for (c, p) in probs.into_iter().enumerate() {
                let target = if c == label { 1.0 } else { 0.0 };
                grad.set(r, c, (p - target) * inv_batch);
            }
        }
        grad
    }
}
