//! Core numeric building blocks.

pub mod running_stats;
pub mod tensor_io;

pub use running_stats::{RunningMeanStd, DEFAULT_COUNT_EPSILON};
pub use tensor_io::{mask_from_vec, mask_to_vec, tensor_from_vec, tensor_to_vec};
