use serde::{Deserialize, Serialize};

use crate::data::labels::LabelEncoder;

/// How the held-out set was carved out of the recordings, so evaluation can
/// rebuild exactly the same split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DataSplit {
    pub seed: u64,
    pub test_fraction: f64,
}

/// Annotations saved next to the weights so a checkpoint can be used for
/// prediction without the training data at hand.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelMetadata {
    pub description: Option<String>,
    /// Length recordings were downsampled to during training.
    pub time_steps: usize,
    /// Human-readable class names, indexed by class id.
    #[serde(default)]
    pub labels: LabelEncoder,
    #[serde(default)]
    pub split: Option<DataSplit>,
}

impl ModelMetadata {
    pub fn label_name(&self, class_id: usize) -> Option<&str> {
        self.labels.decode(class_id)
    }

    /// The split recorded at training time, or `fallback` for checkpoints
    /// saved without one.
    pub fn data_split(&self, fallback: DataSplit) -> DataSplit {
        self.split.unwrap_or(fallback)
    }

    /// Describes the first field that would make `other` read this model's
    /// outputs differently. The description is free text and never counts.
    pub fn incompatibility(&self, other: &ModelMetadata) -> Option<String> {
        if self.time_steps != other.time_steps {
            return Some(format!(
                "time_steps {} vs {}", self.time_steps, other.time_steps
            ));
        }
        if self.labels != other.labels {
            return Some(format!(
                "labels {:?} vs {:?}", self.labels.classes(), other.labels.classes()
            ));
        }
        if self.split != other.split {
            return Some(format!("split {:?} vs {:?}", self.split, other.split));
        }
        None
    }
}
