//! Error types for the base data generator core library.
//!
//! Three independent error families mirror the taxonomy the generator is
//! designed around: configuration errors (rejected before any output file is
//! touched), engine errors (I/O and worker-thread failures), and generation
//! errors (internal invariant violations inside a running generator). Each
//! leaf error exposes a stable, machine-readable code so callers can match on
//! behaviour rather than message text.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Stable codes describing [`ConfigError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ConfigErrorCode {
    /// The configuration file could not be read.
    Io,
    /// The configuration file was not valid JSON, or was missing a key.
    Malformed,
    /// `number_of_friend_edges` exceeded `C(number_of_investors, 2)`.
    TooManyFriendEdges,
    /// `number_of_mirror_edges` did not satisfy the mirror-count invariant.
    TooManyMirrorEdges,
    /// A probability field was outside `[0.0, 1.0]`.
    ProbabilityOutOfRange,
    /// A power-law shape parameter was not strictly positive.
    NonPositiveShapeParameter,
    /// A cardinality field (investors, companies, edges) was zero.
    ZeroCardinality,
}

impl ConfigErrorCode {
    /// Returns the symbolic identifier used in logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "CONFIG_IO",
            Self::Malformed => "CONFIG_MALFORMED",
            Self::TooManyFriendEdges => "CONFIG_TOO_MANY_FRIEND_EDGES",
            Self::TooManyMirrorEdges => "CONFIG_TOO_MANY_MIRROR_EDGES",
            Self::ProbabilityOutOfRange => "CONFIG_PROBABILITY_OUT_OF_RANGE",
            Self::NonPositiveShapeParameter => "CONFIG_NON_POSITIVE_SHAPE_PARAMETER",
            Self::ZeroCardinality => "CONFIG_ZERO_CARDINALITY",
        }
    }
}

/// Errors raised while loading or validating a [`crate::config::Config`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be opened or read.
    #[error("failed to read configuration file `{path}`: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The configuration file was not valid JSON, or was missing a required key.
    #[error("failed to parse configuration file `{path}`: {source}")]
    Malformed {
        /// Path whose contents failed to parse.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// `number_of_friend_edges` exceeded `C(number_of_investors, 2)`.
    #[error(
        "number_of_friend_edges ({requested}) exceeds the maximum possible \
         edges C(number_of_investors, 2) = {max_possible} for {number_of_investors} investors"
    )]
    TooManyFriendEdges {
        /// Requested friend edge count.
        requested: u64,
        /// Maximum possible distinct pairs.
        max_possible: u64,
        /// Configured investor count.
        number_of_investors: u64,
    },
    /// `number_of_mirror_edges` did not satisfy the mirror-count invariant.
    #[error(
        "number_of_mirror_edges ({requested}) must be smaller than \
         number_of_friend_edges ({friend_edges}) x follower_mirrors_a_friend_probability ({probability})"
    )]
    TooManyMirrorEdges {
        /// Requested mirror edge count.
        requested: u64,
        /// Configured friend edge count.
        friend_edges: u64,
        /// Configured mirror probability.
        probability: f64,
    },
    /// A probability field was outside `[0.0, 1.0]`.
    #[error("field `{field}` must be within [0.0, 1.0], got {value}")]
    ProbabilityOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f64,
    },
    /// A power-law shape parameter was not strictly positive.
    #[error("field `{field}` must be strictly positive, got {value}")]
    NonPositiveShapeParameter {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f64,
    },
    /// A cardinality field (investors, companies, edges) was zero.
    #[error("field `{field}` must be greater than zero")]
    ZeroCardinality {
        /// Name of the offending field.
        field: &'static str,
    },
}

impl ConfigError {
    /// Retrieve the stable [`ConfigErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> ConfigErrorCode {
        match self {
            Self::Io { .. } => ConfigErrorCode::Io,
            Self::Malformed { .. } => ConfigErrorCode::Malformed,
            Self::TooManyFriendEdges { .. } => ConfigErrorCode::TooManyFriendEdges,
            Self::TooManyMirrorEdges { .. } => ConfigErrorCode::TooManyMirrorEdges,
            Self::ProbabilityOutOfRange { .. } => ConfigErrorCode::ProbabilityOutOfRange,
            Self::NonPositiveShapeParameter { .. } => ConfigErrorCode::NonPositiveShapeParameter,
            Self::ZeroCardinality { .. } => ConfigErrorCode::ZeroCardinality,
        }
    }
}

/// Stable codes describing [`EngineError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum EngineErrorCode {
    /// Writing or truncating an output file failed.
    Io,
    /// A worker thread panicked instead of returning normally.
    WorkerPanicked,
    /// A worker thread returned a [`GenerationError`].
    Generation,
}

impl EngineErrorCode {
    /// Returns the symbolic identifier used in logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "ENGINE_IO",
            Self::WorkerPanicked => "ENGINE_WORKER_PANICKED",
            Self::Generation => "ENGINE_GENERATION",
        }
    }
}

/// Errors raised while running the batch engine or an edge generator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Opening, truncating, or appending to an output file failed.
    #[error("I/O failure writing `{path}`: {source}")]
    Io {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A worker thread panicked instead of returning normally; the panic
    /// payload cannot be preserved across the thread boundary so only its
    /// presence is recorded.
    #[error("a worker thread panicked before finishing its batches")]
    WorkerPanicked,
    /// A worker thread returned a [`GenerationError`].
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl EngineError {
    /// Retrieve the stable [`EngineErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> EngineErrorCode {
        match self {
            Self::Io { .. } => EngineErrorCode::Io,
            Self::WorkerPanicked => EngineErrorCode::WorkerPanicked,
            Self::Generation(_) => EngineErrorCode::Generation,
        }
    }
}

/// Stable codes describing [`GenerationError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum GenerationErrorCode {
    /// A stripe-lock index fell outside the lock table.
    LockIndexOutOfRange,
    /// A striped-matrix cell index fell outside the matrix.
    CellIndexOutOfRange,
    /// A synchronisation primitive was poisoned by a panicking holder.
    LockPoisoned,
    /// A batch produced a different number of edges than requested.
    GeneratedCountMismatch,
    /// The candidate-sampling retry budget was exhausted without progress.
    RetriesExhausted,
}

impl GenerationErrorCode {
    /// Returns the symbolic identifier used in logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LockIndexOutOfRange => "GENERATION_LOCK_INDEX_OUT_OF_RANGE",
            Self::CellIndexOutOfRange => "GENERATION_CELL_INDEX_OUT_OF_RANGE",
            Self::LockPoisoned => "GENERATION_LOCK_POISONED",
            Self::GeneratedCountMismatch => "GENERATION_GENERATED_COUNT_MISMATCH",
            Self::RetriesExhausted => "GENERATION_RETRIES_EXHAUSTED",
        }
    }
}

/// Internal invariant violations raised from inside a running generator.
///
/// These are treated as bugs: they are never retried and always abort the
/// enclosing [`EngineError`]-returning `run`.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum GenerationError {
    /// A stripe-lock index fell outside the lock table.
    #[error("stripe lock index {index} is out of range (have {lock_count} locks)")]
    LockIndexOutOfRange {
        /// The computed, out-of-range index.
        index: usize,
        /// The number of locks actually available.
        lock_count: usize,
    },
    /// A striped-matrix cell index fell outside the matrix.
    #[error("matrix cell index {index} is out of range (have {cell_count} cells)")]
    CellIndexOutOfRange {
        /// The computed, out-of-range index.
        index: usize,
        /// The number of cells actually available.
        cell_count: usize,
    },
    /// A synchronisation primitive was poisoned by a panicking holder.
    #[error("lock for {resource} is poisoned")]
    LockPoisoned {
        /// Name of the poisoned resource, for diagnostics.
        resource: &'static str,
    },
    /// A batch produced a different number of output lines than requested.
    #[error("batch starting at {start} generated {generated} lines, expected {expected}")]
    GeneratedCountMismatch {
        /// Start of the offending batch window.
        start: u64,
        /// Number of lines actually generated.
        generated: u64,
        /// Number of lines the batch window required.
        expected: u64,
    },
    /// The candidate-sampling retry budget was exhausted without progress.
    #[error(
        "exhausted {attempts} candidate-sampling attempts without producing a new edge; \
         check that the configured distribution parameters can still satisfy the invariant"
    )]
    RetriesExhausted {
        /// Number of attempts made before giving up.
        attempts: u64,
    },
}

impl GenerationError {
    /// Retrieve the stable [`GenerationErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> GenerationErrorCode {
        match self {
            Self::LockIndexOutOfRange { .. } => GenerationErrorCode::LockIndexOutOfRange,
            Self::CellIndexOutOfRange { .. } => GenerationErrorCode::CellIndexOutOfRange,
            Self::LockPoisoned { .. } => GenerationErrorCode::LockPoisoned,
            Self::GeneratedCountMismatch { .. } => GenerationErrorCode::GeneratedCountMismatch,
            Self::RetriesExhausted { .. } => GenerationErrorCode::RetriesExhausted,
        }
    }
}

/// Top-level error returned by the generator orchestrator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BdgError {
    /// Loading or validating the configuration file failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Running the batch engine or an edge generator failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl BdgError {
    /// Retrieve a stable, machine-readable code describing this error,
    /// regardless of which family it originated from.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(err) => err.code().as_str(),
            Self::Engine(err) => err.code().as_str(),
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, BdgError>;
