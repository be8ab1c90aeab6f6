use serde::{Serialize, Deserialize};

/// Streaming classification accuracy: counts accumulate across batches and
/// the ratio is read once at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    pub fn update(&mut self, predicted: &[usize], labels: &[usize]) {
        debug_assert_eq!(predicted.len(), labels.len());
        self.correct += predicted.iter().zip(labels).filter(|(p, l)| p == l).count();
        self.total += labels.len();
    }

    pub fn merge(&mut self, other: Accuracy) {
        self.correct += other.correct;
        self.total += other.total;
    }

    /// Fraction correct in [0, 1]; 0 when nothing was counted.
    pub fn value(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accumulates_across_batches() {
        let mut acc = Accuracy::default();
        acc.update(&[0, 1, 2], &[0, 1, 1]);
        let mut other = Accuracy::default();
        other.update(&[3], &[3]);
        acc.merge(other);
        assert_eq!(acc, Accuracy { correct: 3, total: 4 });
        assert_eq!(acc.value(), 0.75);
        assert_eq!(Accuracy::default().value(), 0.0);
    }

    proptest! {
        #[test]
        fn value_is_bounded(pairs in prop::collection::vec((0usize..5, 0usize..5), 0..200)) {
            let (predicted, labels): (Vec<usize>, Vec<usize>) = pairs.into_iter().unzip();
            let mut acc = Accuracy::default();
            acc.update(&predicted, &labels);
            prop_assert!((0.0..=1.0).contains(&acc.value()));
        }
    }
}
