use serde::{Serialize, Deserialize};

use crate::config::Config;

/// Shape of a classifier network, independent of its trained weights.
///
/// Stored in every checkpoint so a restore can refuse weights that were
/// trained for a different architecture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Sensor channels per time step.
    pub input_channels: usize,
    /// LSTM hidden width.
    pub layer_dim: usize,
    /// Width of the tanh bottleneck layer.
    pub middle_size: usize,
    /// Number of classes (logit width).
    pub output_dim: usize,
    pub forget_bias: f64,
}

impl NetworkSpec {
    pub fn from_config(config: &Config, input_channels: usize) -> NetworkSpec {
        NetworkSpec {
            input_channels,
            layer_dim: config.layer_dim,
            middle_size: config.middle_size,
            output_dim: config.output_dim,
            forget_bias: config.forget_bias,
        }
    }
}
