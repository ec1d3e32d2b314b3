//! Periodic checkpoint saving with retention.
//!
//! Checkpoints are written as `model_{iteration}.json` into the run's log
//! directory. Optionally only the most recent `keep_last_n` files written by
//! this checkpointer are kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::Checkpoint;

/// Configuration for the checkpointer.
#[derive(Debug, Clone)]
pub struct CheckpointerConfig {
    /// Directory to store checkpoints.
    pub checkpoint_dir: PathBuf,
    /// Learning iterations between checkpoint saves.
    pub save_interval: usize,
    /// Number of recent checkpoints to keep (0 = keep all).
    pub keep_last_n: usize,
}

impl Default for CheckpointerConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./logs"),
            save_interval: 50,
            keep_last_n: 0,
        }
    }
}

impl CheckpointerConfig {
    /// Create a new config with specified checkpoint directory.
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            ..Default::default()
        }
    }

    /// Set the save interval.
    pub fn with_save_interval(mut self, interval: usize) -> Self {
        self.save_interval = interval;
        self
    }

    /// Set the number of checkpoints to keep.
    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }
}

/// Error type for checkpointing operations.
#[derive(Debug)]
pub enum CheckpointError {
    /// IO error during save/load.
    Io(io::Error),
    /// JSON encoding or decoding failed.
    Serialization(String),
    /// Burn recorder error.
    Recorder(String),
    /// The file was written by an incompatible format version.
    UnsupportedVersion { found: u32, expected: u32 },
    /// A key required by the current run is absent.
    MissingEntry(&'static str),
    /// No checkpoints found.
    NoCheckpoints,
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "IO error: {}", e),
            CheckpointError::Serialization(e) => write!(f, "Serialization error: {}", e),
            CheckpointError::Recorder(e) => write!(f, "Recorder error: {}", e),
            CheckpointError::UnsupportedVersion { found, expected } => {
                write!(f, "Unsupported checkpoint version {} (expected {})", found, expected)
            }
            CheckpointError::MissingEntry(key) => write!(f, "Checkpoint has no '{}' entry", key),
            CheckpointError::NoCheckpoints => write!(f, "No checkpoints found"),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// Checkpoint metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointInfo {
    /// Path to the checkpoint file.
    pub path: PathBuf,
    /// Iteration encoded in the file name.
    pub iteration: usize,
}

/// Checkpoint file name for an iteration.
pub fn checkpoint_file_name(iteration: usize) -> String {
    format!("model_{}.json", iteration)
}

fn parse_iteration(path: &Path) -> Option<usize> {
    path.file_name()?
        .to_str()?
        .strip_prefix("model_")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// Writes checkpoints on a fixed iteration cadence.
pub struct Checkpointer {
    config: CheckpointerConfig,
    checkpoint_history: Vec<CheckpointInfo>,
}

impl Checkpointer {
    /// Create a new checkpointer.
    ///
    /// Creates the checkpoint directory if it doesn't exist.
    pub fn new(config: CheckpointerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;

        Ok(Self {
            config,
            checkpoint_history: Vec::new(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    /// Check if iteration `iteration` should be checkpointed.
    ///
    /// Iteration 0 is always saved.
    pub fn should_save(&self, iteration: usize) -> bool {
        self.config.save_interval > 0 && iteration % self.config.save_interval == 0
    }

    /// Path a checkpoint for `iteration` is written to.
    pub fn path_for(&self, iteration: usize) -> PathBuf {
        self.config.checkpoint_dir.join(checkpoint_file_name(iteration))
    }

    /// Save `checkpoint` as `model_{iteration}.json`.
    pub fn save(&mut self, checkpoint: &Checkpoint, iteration: usize) -> Result<PathBuf, CheckpointError> {
        let path = self.path_for(iteration);
        checkpoint.save(&path)?;
        log::debug!("Saved checkpoint {}", path.display());

        let info = CheckpointInfo {
            path: path.clone(),
            iteration,
        };
        self.checkpoint_history.retain(|c| c.path != path);
        self.checkpoint_history.push(info);

        self.cleanup_old_checkpoints()?;

        Ok(path)
    }

    /// Find the checkpoint with the highest iteration in the directory.
    pub fn find_latest_checkpoint(&self) -> Result<CheckpointInfo, CheckpointError> {
        self.list_checkpoints()?
            .pop()
            .ok_or(CheckpointError::NoCheckpoints)
    }

    /// List all checkpoints in the directory, sorted by iteration.
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let mut checkpoints: Vec<CheckpointInfo> = fs::read_dir(&self.config.checkpoint_dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                let iteration = parse_iteration(&path)?;
                Some(CheckpointInfo { path, iteration })
            })
            .collect();

        checkpoints.sort_by_key(|c| c.iteration);
        Ok(checkpoints)
    }

    /// Load the latest checkpoint in the directory.
    pub fn load_latest(&self) -> Result<Checkpoint, CheckpointError> {
        let latest = self.find_latest_checkpoint()?;
        Checkpoint::load(&latest.path)
    }

    /// Cleanup old checkpoints, keeping only the last N.
    fn cleanup_old_checkpoints(&mut self) -> Result<(), CheckpointError> {
        if self.config.keep_last_n == 0 {
            return Ok(()); // Keep all
        }

        while self.checkpoint_history.len() > self.config.keep_last_n {
            let old = self.checkpoint_history.remove(0);
            match fs::remove_file(&old.path) {
                Ok(()) => log::debug!("Removed old checkpoint {}", old.path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::warn!("Old checkpoint {} already removed", old.path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}
