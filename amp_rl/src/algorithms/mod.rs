//! Algorithm interface and model selection.

pub mod algorithm;

pub use algorithm::{
    AlgorithmKind, AlgorithmState, AmpAlgorithm, ModelSpec, PolicyKind, StorageSpec, UpdateLosses,
};
