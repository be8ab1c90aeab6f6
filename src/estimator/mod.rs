pub mod checkpoint;
pub mod estimator;
pub mod metrics;
pub mod model_fn;

pub use checkpoint::{Checkpoint, CheckpointManager};
pub use estimator::{Estimator, EvalResult, TrainSummary};
pub use metrics::Accuracy;
pub use model_fn::{model_fn, EstimatorSpec, ModeKey, Prediction};
