pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod estimator;
pub mod train;
pub mod config;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::{dense::Dense, lstm::LstmCell};
pub use network::{DataSplit, LstmClassifier, ModelMetadata, NetworkSpec};
pub use loss::SparseSoftmaxCrossEntropy;
pub use optim::{Adam, Optimizer, OptimizerConfig, Sgd};
pub use data::{create_median_filtered_dataset, input_fn, Dataset, LabelEncoder, Sequences};
pub use estimator::{model_fn, Estimator, EstimatorSpec, EvalResult, ModeKey, Prediction};
pub use train::{run_epochs, EpochStats};
pub use config::Config;
pub use error::{Error, Result};
