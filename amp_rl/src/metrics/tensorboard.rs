//! TensorBoard event-file sink.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tensorboard_rs::summary_writer::SummaryWriter as EventWriter;

use super::writer::SummaryWriter;

/// Prefix of the event files TensorBoard reads.
pub const EVENT_FILE_PREFIX: &str = "events.out.tfevents";

/// Writes scalars as TensorBoard events under the log directory.
pub struct TensorboardWriter {
    events: EventWriter,
    log_dir: PathBuf,
}

impl TensorboardWriter {
    pub fn new(log_dir: impl AsRef<Path>) -> io::Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir)?;
        Ok(Self {
            events: EventWriter::new(&log_dir),
            log_dir,
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

impl SummaryWriter for TensorboardWriter {
    /// Event values are single precision.
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> io::Result<()> {
        self.events.add_scalar(tag, value as f32, step);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.events.flush();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn event_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(EVENT_FILE_PREFIX))
            })
            .collect()
    }

    #[test]
    fn test_writes_event_file() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("run");
        let mut writer = TensorboardWriter::new(&log_dir).unwrap();
        writer.add_scalar("Loss/amp", 0.25, 0).unwrap();
        writer.add_scalar("Loss/amp", 0.125, 1).unwrap();
        writer.flush().unwrap();

        let files = event_files(&log_dir);
        assert_eq!(files.len(), 1);
        assert!(fs::metadata(&files[0]).unwrap().len() > 0);
    }
}
