//! Logging backend selection.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::tensorboard::TensorboardWriter;
use super::writer::{MultiWriter, ScalarFileWriter, SummaryWriter};
use crate::error::{ConfigError, Result};

/// Logging backend named in the run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LoggerKind {
    /// TensorBoard event files plus a scalar CSV in the log directory.
    #[default]
    Tensorboard,
    Wandb,
    Neptune,
}

impl LoggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tensorboard => "tensorboard",
            Self::Wandb => "wandb",
            Self::Neptune => "neptune",
        }
    }
}

impl fmt::Display for LoggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggerKind {
    type Err = ConfigError;

    /// Case-insensitive.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tensorboard" => Ok(Self::Tensorboard),
            "wandb" => Ok(Self::Wandb),
            "neptune" => Ok(Self::Neptune),
            _ => Err(ConfigError::UnknownVariant {
                field: "logger",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for LoggerKind {
    type Error = ConfigError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LoggerKind> for String {
    fn from(kind: LoggerKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Build the sink for `kind` writing under `log_dir`.
///
/// Remote backends need a transport this crate does not ship and fail with
/// [`ConfigError::BackendUnavailable`].
pub fn create_writer(kind: LoggerKind, log_dir: &Path) -> Result<Box<dyn SummaryWriter>> {
    match kind {
        LoggerKind::Tensorboard => {
            let events = TensorboardWriter::new(log_dir)?;
            let scalars = ScalarFileWriter::new(log_dir)?;
            log::info!(
                "Writing TensorBoard events to {} and scalars to {}",
                events.log_dir().display(),
                scalars.path().display()
            );
            Ok(Box::new(MultiWriter::new().add(events).add(scalars)))
        }
        LoggerKind::Wandb | LoggerKind::Neptune => Err(ConfigError::BackendUnavailable {
            backend: kind.as_str().to_string(),
        }
        .into()),
    }
}
