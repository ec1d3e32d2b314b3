//! Training metrics and logging.
//!
//! ## Sinks
//!
//! - [`SummaryWriter`]: scalar sink trait, one instance per run
//! - [`TensorboardWriter`]: TensorBoard event files (`tensorboard` logger kind)
//! - [`ScalarFileWriter`]: local CSV scalars, written next to the events
//! - [`MultiWriter`]: fan out to several sinks
//!
//! ## Bookkeeping
//!
//! - [`EpisodeTracker`]: per-environment returns and lengths
//! - [`IterationSummary`]: per-iteration scalars and console block

pub mod backend;
pub mod episode_tracker;
pub mod summary;
pub mod tensorboard;
pub mod writer;

pub use backend::{create_writer, LoggerKind};
pub use episode_tracker::{EpisodeTracker, EPISODE_WINDOW};
pub use summary::IterationSummary;
pub use tensorboard::{TensorboardWriter, EVENT_FILE_PREFIX};
pub use writer::{MultiWriter, ScalarFileWriter, SummaryWriter, SUMMARY_FILE_NAME};
