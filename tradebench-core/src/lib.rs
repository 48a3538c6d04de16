//! Base data generator core library.
//!
//! Produces the benchmark's investor, company, and tradebook vertex files,
//! its friend/mirror edge files, and the auxiliary permutation lists a query
//! driver consumes, from a single validated [`Config`].

/// The reusable parallel batch engine: dispenser, file sink, worker pool.
pub mod batch;
/// Typed configuration loading and validation.
pub mod config;
/// Friend and mirror edge generators.
pub mod edges;
/// Error types shared across the crate.
pub mod error;
/// Top-level sequencing of every generator described by a [`Config`].
pub mod orchestrator;
/// Permutation generation and persistence.
pub mod permutation;
/// Uniform, power-law, and permutation sampling primitives.
pub mod random;
/// Vertex generators built on top of the batch engine.
pub mod vertex;

pub use crate::{
    config::Config,
    error::{BdgError, ConfigError, ConfigErrorCode, EngineError, EngineErrorCode, GenerationError, GenerationErrorCode, Result},
    orchestrator::run,
};
