use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::sequences::Sequences;
use crate::error::{Error, Result};

/// Paired feature and label arrays: one class index per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Sequences,
    pub labels: Vec<usize>,
}

impl Dataset {
    pub fn new(features: Sequences, labels: Vec<usize>) -> Result<Dataset> {
        if features.len() != labels.len() {
            return Err(Error::shape(format!(
                "{} feature sequences but {} labels", features.len(), labels.len()
            )));
        }
        Ok(Dataset { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Shuffles with `seed` and holds out `test_fraction` of the samples.
    /// Both halves keep at least one sample.
    pub fn split(&self, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
        if self.len() < 2 {
            return Err(Error::dataset(format!(
                "need at least 2 samples to split, got {}", self.len()
            )));
        }
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));

        let n_test = ((self.len() as f64 * test_fraction).round() as usize).clamp(1, self.len() - 1);
        let (test_idx, train_idx) = indices.split_at(n_test);
        Ok((self.subset(train_idx), self.subset(test_idx)))
    }
}
