pub mod dataset;
pub mod input;
pub mod labels;
pub mod median;
pub mod preprocessing;
pub mod sequences;

pub use dataset::Dataset;
pub use input::{input_fn, Batch, InputFn};
pub use labels::LabelEncoder;
pub use preprocessing::create_median_filtered_dataset;
pub use sequences::Sequences;
