//! Scalar summary sinks.
//!
//! The runner writes every metric through a [`SummaryWriter`] chosen once at
//! startup. [`ScalarFileWriter`] appends `tag,step,value,wall_time` rows to
//! `summaries.csv` in the log directory; the `tensorboard` logger kind pairs
//! it with a [`TensorboardWriter`](super::TensorboardWriter).

use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// File the local sink writes into.
pub const SUMMARY_FILE_NAME: &str = "summaries.csv";

/// Destination for scalar metrics and saved models.
pub trait SummaryWriter {
    /// Record `value` under `tag` at x-axis position `step`.
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> io::Result<()>;

    /// Notify the sink that a checkpoint was written.
    ///
    /// Remote sinks upload the file; local sinks need do nothing.
    fn save_model(&mut self, _path: &Path, _iteration: usize) -> io::Result<()> {
        Ok(())
    }

    /// Whether the sink wants the wall-clock `/time` variants of the
    /// training curves.
    fn wants_time_axis(&self) -> bool {
        true
    }

    /// Flush any buffered output.
    fn flush(&mut self) -> io::Result<()>;
}

/// Local CSV scalar sink.
pub struct ScalarFileWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    start_time: Instant,
}

impl ScalarFileWriter {
    /// Open (or append to) `summaries.csv` under `log_dir`.
    pub fn new(log_dir: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(log_dir.as_ref())?;
        let path = log_dir.as_ref().join(SUMMARY_FILE_NAME);
        let is_new = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);

        if is_new {
            writeln!(writer, "tag,step,value,wall_time")?;
        }

        Ok(Self {
            writer,
            path,
            start_time: Instant::now(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SummaryWriter for ScalarFileWriter {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> io::Result<()> {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        writeln!(self.writer, "{},{},{},{:.3}", csv_field(tag), step, value, elapsed)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for ScalarFileWriter {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}

/// Quote a CSV field if it contains a separator, quote or line break.
fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Writer that fans out to several sinks.
#[derive(Default)]
pub struct MultiWriter {
    writers: Vec<Box<dyn SummaryWriter>>,
}

impl MultiWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn add<W: SummaryWriter + 'static>(mut self, writer: W) -> Self {
        self.writers.push(Box::new(writer));
        self
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl SummaryWriter for MultiWriter {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> io::Result<()> {
        for writer in &mut self.writers {
            writer.add_scalar(tag, value, step)?;
        }
        Ok(())
    }

    fn save_model(&mut self, path: &Path, iteration: usize) -> io::Result<()> {
        for writer in &mut self.writers {
            writer.save_model(path, iteration)?;
        }
        Ok(())
    }

    /// True only if every sink wants the time axis.
    fn wants_time_axis(&self) -> bool {
        self.writers.iter().all(|w| w.wants_time_axis())
    }

    fn flush(&mut self) -> io::Result<()> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct Recorded(Rc<RefCell<Vec<(String, f64, usize)>>>);

    impl SummaryWriter for Recorded {
        fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> io::Result<()> {
            self.0.borrow_mut().push((tag.to_string(), value, step));
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl SummaryWriter for Broken {
        fn add_scalar(&mut self, _tag: &str, _value: f64, _step: usize) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn test_scalar_file_writer() {
        let dir = tempdir().unwrap();
        {
            let mut writer = ScalarFileWriter::new(dir.path()).unwrap();
            writer.add_scalar("Loss/value_function", 0.5, 3).unwrap();
            writer.add_scalar("Perf/total_fps", 1200.0, 3).unwrap();
        }
        let contents = fs::read_to_string(dir.path().join(SUMMARY_FILE_NAME)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "tag,step,value,wall_time");
        assert!(lines[1].starts_with("Loss/value_function,3,0.5,"));
        assert!(lines[2].starts_with("Perf/total_fps,3,1200,"));
    }

    #[test]
    fn test_scalar_file_writer_appends_without_second_header() {
        let dir = tempdir().unwrap();
        {
            let mut writer = ScalarFileWriter::new(dir.path()).unwrap();
            writer.add_scalar("a", 1.0, 0).unwrap();
        }
        {
            let mut writer = ScalarFileWriter::new(dir.path()).unwrap();
            writer.add_scalar("a", 2.0, 1).unwrap();
        }
        let contents = fs::read_to_string(dir.path().join(SUMMARY_FILE_NAME)).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_multi_writer_fans_out() {
        let a = Recorded::default();
        let b = Recorded::default();
        let mut multi = MultiWriter::new().add(a.clone()).add(b.clone());
        assert_eq!(multi.len(), 2);

        multi.add_scalar("Train/mean_reward", 1.5, 7).unwrap();
        multi.flush().unwrap();

        assert_eq!(a.0.borrow().as_slice(), &[("Train/mean_reward".to_string(), 1.5, 7)]);
        assert_eq!(b.0.borrow().len(), 1);
        assert!(multi.wants_time_axis());
    }

    #[test]
    fn test_scalar_file_writer_quotes_tags() {
        let dir = tempdir().unwrap();
        {
            let mut writer = ScalarFileWriter::new(dir.path()).unwrap();
            writer.add_scalar("Episode/rew_a,b", 1.0, 0).unwrap();
            writer.add_scalar("Episode/say \"hi\"", 2.0, 0).unwrap();
        }
        let contents = fs::read_to_string(dir.path().join(SUMMARY_FILE_NAME)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert!(lines[1].starts_with("\"Episode/rew_a,b\",0,1,"), "{}", lines[1]);
        assert!(lines[2].starts_with("\"Episode/say \"\"hi\"\"\",0,2,"), "{}", lines[2]);
    }

    #[test]
    fn test_multi_writer_propagates_errors() {
        let ok = Recorded::default();
        let mut multi = MultiWriter::new().add(ok.clone()).add(Broken);

        let err = multi.add_scalar("Loss/amp", 0.5, 0).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(multi.flush().is_err());
        assert_eq!(ok.0.borrow().len(), 1);
    }
}
