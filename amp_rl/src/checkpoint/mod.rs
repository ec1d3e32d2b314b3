//! Training checkpoints.
//!
//! ## Example
//!
//! ```rust,ignore
//! use amp_rl::checkpoint::{Checkpointer, CheckpointerConfig};
//!
//! let config = CheckpointerConfig::new(log_dir)
//!     .with_save_interval(50)
//!     .with_keep_last_n(5);
//!
//! let mut checkpointer = Checkpointer::new(config)?;
//!
//! // In training loop:
//! if checkpointer.should_save(it) {
//!     checkpointer.save(&checkpoint, it)?;
//! }
//!
//! // Resume training:
//! let checkpoint = checkpointer.load_latest()?;
//! ```

pub mod checkpointer;
pub mod record;

pub use checkpointer::{
    checkpoint_file_name, CheckpointError, CheckpointInfo, Checkpointer, CheckpointerConfig,
};
pub use record::{module_from_bytes, module_to_bytes, Checkpoint, CHECKPOINT_VERSION};
