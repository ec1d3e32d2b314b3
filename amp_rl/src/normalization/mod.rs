//! Input normalization.
//!
//! - [`Normalizer`]: clipped standardization of AMP observations
//! - [`EmpiricalNormalizer`]: optional policy/critic observation normalization

pub mod empirical;
pub mod normalizer;

pub use empirical::{EmpiricalNormalizer, DEFAULT_UNTIL, EMPIRICAL_EPSILON};
pub use normalizer::{Normalizer, NormalizerConfig};
