//! Checkpoint files inside a model directory.
//!
//! ```text
//! model_dir/
//!   checkpoint.json            index: latest + retained checkpoint names
//!   model.ckpt-120.json        weights, optimizer slots, metadata at step 120
//!   model.ckpt-240.json
//! ```

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::network::metadata::ModelMetadata;
use crate::network::network::LstmClassifier;
use crate::optim::Optimizer;

const INDEX_FILE: &str = "checkpoint.json";

/// Everything needed to resume training or serve predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub global_step: u64,
    pub model: LstmClassifier,
    pub optimizer: Optimizer,
    pub metadata: ModelMetadata,
}

/// Contents of `checkpoint.json`. Names are relative to the model directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub model_checkpoint_path: String,
    pub all_model_checkpoint_paths: Vec<String>,
}

pub struct CheckpointManager {
    dir: PathBuf,
    keep_max: usize,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>, keep_max: usize) -> Self {
        Self { dir: dir.into(), keep_max: keep_max.max(1) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> Result<Option<CheckpointState>> {
        let path = self.dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(fs::File::open(&path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    /// Loads the checkpoint named by the index, if any.
    pub fn latest(&self) -> Result<Option<Checkpoint>> {
        let Some(state) = self.state()? else {
            return Ok(None);
        };
        let path = self.dir.join(&state.model_checkpoint_path);
        if !path.exists() {
            return Err(Error::checkpoint(format!(
                "index names {} but the file is missing", path.display()
            )));
        }
        let reader = BufReader::new(fs::File::open(&path)?);
        let checkpoint: Checkpoint = serde_json::from_reader(reader)?;
        info!(path = %path.display(), step = checkpoint.global_step, "Restoring parameters");
        Ok(Some(checkpoint))
    }

    /// Writes `model.ckpt-<step>.json`, updates the index, and deletes the
    /// oldest checkpoints beyond `keep_max`.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let name = format!("model.ckpt-{}.json", checkpoint.global_step);
        let path = self.dir.join(&name);
        write_json(&path, checkpoint)?;

        let mut state = self.state()?.unwrap_or_default();
        state.all_model_checkpoint_paths.retain(|n| n != &name);
        state.all_model_checkpoint_paths.push(name.clone());
        state.model_checkpoint_path = name;

        let excess = state.all_model_checkpoint_paths.len().saturating_sub(self.keep_max);
        for old in state.all_model_checkpoint_paths.drain(..excess) {
            if let Err(e) = fs::remove_file(self.dir.join(&old)) {
                warn!(checkpoint = %old, error = %e, "could not delete old checkpoint");
            }
        }

        write_json(&self.dir.join(INDEX_FILE), &state)?;
        info!(path = %path.display(), step = checkpoint.global_step, "Saving checkpoint");
        Ok(path)
    }
}

/// Writes through a temporary file so a crash never leaves a truncated
/// checkpoint behind. The temporary file is only renamed once every byte
/// has reached the disk.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let written = fs::File::create(&tmp)
        .map_err(Error::from)
        .and_then(|file| write_buffered(file, value))
        .and_then(|file| file.sync_all().map_err(Error::from));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Serializes `value` into `inner` and flushes, surfacing a failure on the
/// last buffered chunk instead of losing it on drop.
fn write_buffered<W: Write, T: Serialize>(inner: W, value: &T) -> Result<W> {
    let mut writer = BufWriter::new(inner);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    writer.into_inner().map_err(|e| Error::from(e.into_error()))
}
