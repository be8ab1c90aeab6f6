use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Feature tensor of shape `(samples, time_steps, channels)`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequences {
    samples: usize,
    time_steps: usize,
    channels: usize,
    data: Vec<f64>,
}

impl Sequences {
    pub fn new(samples: usize, time_steps: usize, channels: usize, data: Vec<f64>) -> Result<Sequences> {
        if data.len() != samples * time_steps * channels {
            return Err(Error::shape(format!(
                "{} values cannot fill a ({}, {}, {}) tensor",
                data.len(), samples, time_steps, channels
            )));
        }
        Ok(Sequences { samples, time_steps, channels, data })
    }

    /// Stacks per-sample `time_steps × channels` blocks.
    pub fn from_samples(samples: &[Vec<Vec<f64>>]) -> Result<Sequences> {
        let time_steps = samples.first().map_or(0, |s| s.len());
        let channels = samples.first().and_then(|s| s.first()).map_or(0, |row| row.len());
        let mut data = Vec::with_capacity(samples.len() * time_steps * channels);
        for (i, sample) in samples.iter().enumerate() {
            if sample.len() != time_steps || sample.iter().any(|row| row.len() != channels) {
                return Err(Error::shape(format!(
                    "sample {} does not have shape ({}, {})", i, time_steps, channels
                )));
            }
            for row in sample {
                data.extend_from_slice(row);
            }
        }
        Ok(Sequences { samples: samples.len(), time_steps, channels, data })
    }

    /// `(samples, time_steps, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.samples, self.time_steps, self.channels)
    }

    pub fn len(&self) -> usize {
        self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// One sample as a `time_steps × channels` slice.
    pub fn sample(&self, i: usize) -> &[f64] {
        let stride = self.time_steps * self.channels;
        &self.data[i * stride..(i + 1) * stride]
    }

    /// Gathers the given samples, in the given order, into a new tensor.
    pub fn select(&self, indices: &[usize]) -> Sequences {
        let mut data = Vec::with_capacity(indices.len() * self.time_steps * self.channels);
        for &i in indices {
            data.extend_from_slice(self.sample(i));
        }
        Sequences {
            samples: indices.len(),
            time_steps: self.time_steps,
            channels: self.channels,
            data,
        }
    }

    /// Time step `t` of every sample, as a `samples × channels` matrix.
    pub fn unstack_step(&self, t: usize) -> Matrix {
        let mut data = Vec::with_capacity(self.samples * self.channels);
        for i in 0..self.samples {
            let start = t * self.channels;
            data.extend_from_slice(&self.sample(i)[start..start + self.channels]);
        }
        Matrix::from_vec(self.samples, self.channels, data)
    }

    /// Splits the time axis into one matrix per step, ready to feed a
    /// recurrent cell.
    pub fn unstack(&self) -> Vec<Matrix> {
        (0..self.time_steps).map(|t| self.unstack_step(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor() -> Sequences {
        // 2 samples, 3 steps, 2 channels; value = 100·sample + 10·step + channel
        let mut data = Vec::new();
        for s in 0..2 {
            for t in 0..3 {
                for c in 0..2 {
                    data.push((100 * s + 10 * t + c) as f64);
                }
            }
        }
        Sequences::new(2, 3, 2, data).unwrap()
    }

    #[test]
    fn unstack_slices_time_axis() {
        let steps = tensor().unstack();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].row(0), &[10.0, 11.0]);
        assert_eq!(steps[1].row(1), &[110.0, 111.0]);
    }

    #[test]
    fn unstack_step_matches_unstack() {
        let x = tensor();
        let last = x.unstack_step(2);
        assert_eq!((last.rows, last.cols), (2, 2));
        assert_eq!(last.row(1), &[120.0, 121.0]);
        assert_eq!(x.unstack()[2], last);
    }

    #[test]
    fn select_reorders_samples() {
        let picked = tensor().select(&[1, 0, 1]);
        assert_eq!(picked.shape(), (3, 3, 2));
        assert_eq!(picked.sample(0)[0], 100.0);
        assert_eq!(picked.sample(1)[0], 0.0);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(Sequences::new(2, 2, 2, vec![0.0; 7]), Err(Error::Shape(_))));
    }

    #[test]
    fn from_samples_rejects_ragged() {
        let samples = vec![vec![vec![1.0, 2.0]], vec![vec![1.0]]];
        assert!(Sequences::from_samples(&samples).is_err());
    }
}
