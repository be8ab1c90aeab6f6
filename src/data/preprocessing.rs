//! Turns raw motion recordings into fixed-shape training tensors.
//!
//! Input layout:
//!
//! ```text
//! train.csv                 index, one row per recording
//!   Subject,Datafile,Label
//!   Subject02,Subject02/Subject02_Aufnahme000.csv,curve-left-step
//! Subject02/Subject02_Aufnahme000.csv
//!   headerless numeric CSV, rows = time, columns = sensor channels
//! ```
//!
//! `Datafile` paths are resolved against the index file's directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::data::dataset::Dataset;
use crate::data::labels::LabelEncoder;
use crate::data::median::downsample_recording;
use crate::data::sequences::Sequences;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct IndexRecord {
    #[serde(rename = "Subject")]
    subject: String,
    #[serde(rename = "Datafile")]
    datafile: String,
    #[serde(rename = "Label")]
    label: String,
}

/// Reads one headerless recording into `time × channels` rows.
pub fn read_recording(path: &Path) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = record.iter()
            .map(|cell| {
                cell.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| Error::dataset(format!(
                        "{}: row {}: '{}' is not a finite number", path.display(), row_idx + 1, cell
                    )))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    if rows.is_empty() || rows[0].is_empty() {
        return Err(Error::dataset(format!("{}: recording is empty", path.display())));
    }
    Ok(rows)
}

/// Reads a recording and median-downsamples every channel to `time_steps`.
pub fn load_recording(path: &Path, time_steps: usize) -> Result<Vec<Vec<f64>>> {
    let rows = read_recording(path)?;
    Ok(downsample_recording(&rows, time_steps))
}

/// Loads every recording listed in `index_csv` into one dataset.
pub fn load_dataset(index_csv: &Path, time_steps: usize) -> Result<(Dataset, LabelEncoder)> {
    let base_dir: PathBuf = index_csv.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(index_csv)?;
    let entries = reader.deserialize::<IndexRecord>().collect::<std::result::Result<Vec<_>, _>>()?;
    if entries.is_empty() {
        return Err(Error::dataset(format!("{} lists no recordings", index_csv.display())));
    }

    let encoder = LabelEncoder::fit(entries.iter().map(|e| e.label.as_str()));
    info!(
        recordings = entries.len(),
        classes = encoder.len(),
        time_steps,
        "Generating data"
    );

    let mut samples = Vec::with_capacity(entries.len());
    let mut labels = Vec::with_capacity(entries.len());
    let mut channels = None;
    for entry in &entries {
        let path = base_dir.join(&entry.datafile);
        debug!(subject = %entry.subject, file = %path.display(), "reading recording");
        let block = load_recording(&path, time_steps)?;

        let width = block[0].len();
        match channels {
            None => channels = Some(width),
            Some(expected) if expected != width => {
                return Err(Error::dataset(format!(
                    "{} has {} channels, expected {}", path.display(), width, expected
                )));
            }
            Some(_) => {}
        }

        samples.push(block);
        // Every label was fed to the encoder above.
        labels.push(encoder.encode(&entry.label).unwrap_or_default());
    }

    let features = Sequences::from_samples(&samples)?;
    Ok((Dataset::new(features, labels)?, encoder))
}

/// Full preprocessing: load, median-downsample to `time_steps`, then split
/// off `test_fraction` of the recordings as the held-out set.
pub fn create_median_filtered_dataset(
    index_csv: &Path,
    time_steps: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<((Dataset, Dataset), LabelEncoder)> {
    let (dataset, encoder) = load_dataset(index_csv, time_steps)?;
    let (train, test) = dataset.split(test_fraction, seed)?;
    info!(train = train.len(), test = test.len(), "split dataset");
    Ok(((train, test), encoder))
}
