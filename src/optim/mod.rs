pub mod adam;
pub mod sgd;

use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

pub use adam::Adam;
pub use sgd::Sgd;

/// Optimizer choice as written in a config file:
///
/// ```toml
/// [optimizer]
/// kind = "adam"
/// learning_rate = 0.001
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam {
        #[serde(default = "default_adam_lr")]
        learning_rate: f64,
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    Sgd {
        learning_rate: f64,
    },
}

fn default_adam_lr() -> f64 { 0.001 }
fn default_beta1() -> f64 { 0.9 }
fn default_beta2() -> f64 { 0.999 }
fn default_epsilon() -> f64 { 1e-8 }

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam {
            learning_rate: default_adam_lr(),
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }
}

impl OptimizerConfig {
    pub fn learning_rate(&self) -> f64 {
        match self {
            OptimizerConfig::Adam { learning_rate, .. } => *learning_rate,
            OptimizerConfig::Sgd { learning_rate } => *learning_rate,
        }
    }

    pub fn build(&self) -> Optimizer {
        match *self {
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                Optimizer::Adam(Adam::new(learning_rate, beta1, beta2, epsilon))
            }
            OptimizerConfig::Sgd { learning_rate } => Optimizer::Sgd(Sgd::new(learning_rate)),
        }
    }
}

/// A stateful optimizer instance. Serialisable so its slots survive a
/// checkpoint round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Optimizer {
    Adam(Adam),
    Sgd(Sgd),
}

impl Optimizer {
    /// Updates `params` in place. `grads[i]` must have the shape of `params[i]`.
    pub fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) {
        debug_assert_eq!(params.len(), grads.len());
        match self {
            Optimizer::Adam(adam) => adam.step(params, grads),
            Optimizer::Sgd(sgd) => sgd.step(params, grads),
        }
    }
}
