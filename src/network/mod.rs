pub mod metadata;
pub mod network;
pub mod spec;

pub use metadata::{DataSplit, ModelMetadata};
pub use network::{Gradients, LstmClassifier};
pub use spec::NetworkSpec;
