//! Error types for the simulator.
//!
//! Each layer gets its own error enum; higher layers wrap lower ones with
//! `#[from]` so `?` composes across module boundaries.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error returned when attempting to convert an invalid byte/character into
/// a `Nucleotide`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub struct InvalidNucleotide(pub u8);

impl fmt::Display for InvalidNucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid nucleotide byte: {} ('{}')", self.0, self.0 as char)
    }
}

/// Error type for failures when parsing or constructing a `Sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSequence {
    /// A character was not recognized as a valid nucleotide.
    #[error("invalid character in sequence: '{0}'")]
    InvalidChar(char),

    /// The sequence was empty when a non-empty sequence was required.
    #[error("empty sequence not allowed")]
    EmptySequence,
}

/// Errors raised while building feature coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    #[error("feature '{feature}' has a zero-length fragment")]
    EmptyFragment { feature: String },

    #[error("fragments of feature '{feature}' overlap or are not in ascending order")]
    UnorderedFragments { feature: String },

    #[error("feature '{feature}' ends at {end} but the genome has length {length}")]
    OutOfRange {
        feature: String,
        end: usize,
        length: usize,
    },

    #[error("feature name '{0}' is defined more than once")]
    DuplicateFeature(String),

    #[error("unknown feature '{0}'")]
    UnknownFeature(String),
}

/// Errors raised when building mutation models.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error("invalid mutation rate: {0}")]
    InvalidMutationRate(f64),

    #[error("substitution matrix is not symmetric at ({row}, {column})")]
    AsymmetricMatrix { row: usize, column: usize },

    #[error("indel length parameter must lie in (0, 1], got {0}")]
    InvalidLengthParameter(f64),

    /// Two substitutions in one replication target the same site.
    #[error("conflicting substitutions at position {0}")]
    ConflictingSubstitutions(usize),

    #[error("a replication may carry at most one indel, got {0}")]
    MultipleIndels(usize),
}

/// Errors raised when building recombination parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecombinationError {
    #[error("invalid {0}: {1} (expected a probability in [0, 1])")]
    InvalidProbability(&'static str, f64),

    #[error("invalid hotspot [{start}, {end}) with boost {boost}")]
    InvalidHotspot { start: usize, end: usize, boost: f64 },
}

/// Errors raised by fitness evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitnessError {
    /// Substitutions arrived out of ascending order, so codons can no longer
    /// be grouped into consistent before/after states.
    #[error("codon {codon} of feature {feature} visited after codon {previous}")]
    CodonMismatch {
        feature: usize,
        codon: usize,
        previous: usize,
    },

    /// A factor was configured with an unusable value.
    #[error("invalid fitness parameter: {0}")]
    InvalidParameter(String),
}

/// Errors raised by the gene pool.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenePoolError {
    /// The identifier points at a slot that has since been released or reused.
    #[error("stale genome id (slot {index}, generation {generation})")]
    StaleGenome { index: u32, generation: u32 },

    /// A genome whose frequency already reached zero was killed again.
    #[error("genome in slot {index} released more than once")]
    DoubleRelease { index: u32 },

    #[error(transparent)]
    Fitness(#[from] FitnessError),

    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Sequence(#[from] InvalidSequence),

    #[error(transparent)]
    Coordinates(#[from] CoordinateError),

    #[error(transparent)]
    Fitness(#[from] FitnessError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Recombination(#[from] RecombinationError),

    #[error(transparent)]
    Pool(#[from] GenePoolError),
}

/// Errors raised by samplers while writing output.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("failed to write sample: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pool(#[from] GenePoolError),
}

/// Top-level error for a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Pool(#[from] GenePoolError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The size model asked for more parent draws than can be addressed.
    #[error("generation {generation}: {offspring} offspring with {parents} parents each overflows")]
    PopulationOverflow {
        generation: usize,
        offspring: usize,
        parents: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_nucleotide_display() {
        let err = InvalidNucleotide(b'X');
        assert_eq!(err.to_string(), "invalid nucleotide byte: 88 ('X')");
    }

    #[test]
    fn test_config_error_keeps_pool_error() {
        let err: ConfigError = GenePoolError::StaleGenome {
            index: 3,
            generation: 1,
        }
        .into();
        assert!(matches!(
            err,
            ConfigError::Pool(GenePoolError::StaleGenome { index: 3, .. })
        ));
        let err: ConfigError = GenePoolError::from(MutationError::MultipleIndels(2)).into();
        assert_eq!(err.to_string(), "a replication may carry at most one indel, got 2");
    }

    #[test]
    fn test_pool_error_wraps_fitness_error() {
        let err: GenePoolError = FitnessError::CodonMismatch {
            feature: 0,
            codon: 1,
            previous: 4,
        }
        .into();
        assert!(matches!(err, GenePoolError::Fitness(_)));
        assert_eq!(err.to_string(), "codon 1 of feature 0 visited after codon 4");
    }

    #[test]
    fn test_simulation_error_from_pool_error() {
        let err: SimulationError = GenePoolError::DoubleRelease { index: 3 }.into();
        assert!(err.to_string().contains("slot 3"));
    }
}
