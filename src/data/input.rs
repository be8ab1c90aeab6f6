use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::Config;
use crate::data::sequences::Sequences;

/// One mini-batch handed to the model function.
#[derive(Debug, Clone)]
pub struct Batch {
    pub features: Sequences,
    pub labels: Vec<usize>,
}

/// In-memory input pipeline over paired arrays.
///
/// Each pass visits every sample exactly once; the last batch of a pass may
/// be short.
#[derive(Debug, Clone, Copy)]
pub struct InputFn<'a> {
    pub features: &'a Sequences,
    pub labels: &'a [usize],
    pub batch_size: usize,
    pub num_epochs: usize,
    pub shuffle: bool,
}

/// Single shuffled pass in batches of `config.batch_size`.
pub fn input_fn<'a>(x: &'a Sequences, y: &'a [usize], config: &Config) -> InputFn<'a> {
    InputFn {
        features: x,
        labels: y,
        batch_size: config.batch_size,
        num_epochs: 1,
        shuffle: true,
    }
}

impl<'a> InputFn<'a> {
    /// Materialises the batch order for this run using `rng` for shuffling.
    pub fn batches<R: Rng + ?Sized>(&self, rng: &mut R) -> Batches<'a> {
        let n = self.features.len().min(self.labels.len());
        let mut order = Vec::with_capacity(n * self.num_epochs);
        for _ in 0..self.num_epochs {
            let mut indices: Vec<usize> = (0..n).collect();
            if self.shuffle {
                indices.shuffle(rng);
            }
            order.extend(indices);
        }
        Batches {
            features: self.features,
            labels: self.labels,
            order,
            batch_size: self.batch_size.max(1),
            cursor: 0,
        }
    }
}

pub struct Batches<'a> {
    features: &'a Sequences,
    labels: &'a [usize],
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let indices = &self.order[self.cursor..end];
        self.cursor = end;
        Some(Batch {
            features: self.features.select(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn one_pass_covers_every_sample_once() {
        let x = Sequences::new(10, 1, 1, (0..10).map(|i| i as f64).collect()).unwrap();
        let y: Vec<usize> = (0..10).collect();
        let config = Config { batch_size: 4, ..Config::default() };
        let mut rng = StdRng::seed_from_u64(9);

        let batches: Vec<Batch> = input_fn(&x, &y, &config).batches(&mut rng).collect();
        assert_eq!(batches.iter().map(|b| b.labels.len()).collect::<Vec<_>>(), vec![4, 4, 2]);

        let mut seen: Vec<usize> = batches.iter().flat_map(|b| b.labels.clone()).collect();
        for b in &batches {
            // features travel with their labels
            for (i, &label) in b.labels.iter().enumerate() {
                assert_eq!(b.features.sample(i)[0] as usize, label);
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, y);
    }

    #[test]
    fn unshuffled_pass_keeps_order() {
        let x = Sequences::new(3, 1, 1, vec![0.0, 1.0, 2.0]).unwrap();
        let y = [0, 1, 2];
        let input = InputFn { features: &x, labels: &y, batch_size: 2, num_epochs: 2, shuffle: false };
        let labels: Vec<Vec<usize>> = input.batches(&mut StdRng::seed_from_u64(0)).map(|b| b.labels).collect();
        assert_eq!(labels, vec![vec![0, 1], vec![2, 0], vec![1, 2]]);
    }
}
