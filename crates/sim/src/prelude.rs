//! Commonly used imports for convenience.
//!
//! # Example
//!
//! ```
//! use santa_sim::prelude::*;
//! use std::str::FromStr;
//!
//! let seq = Sequence::from_str("ACGT").unwrap();
//! assert_eq!(seq.len(), 4);
//! ```

pub use crate::base::{AminoAcid, Nucleotide, Sequence, SharedSequence, StateSource};
pub use crate::coordinates::{Feature, FeatureType, Fragment, GenomeDescription};
pub use crate::errors;
pub use crate::evolution::{
    ClonalReplicator, FitnessProportionalSelector, Mutation, MutationSet, Mutator,
    PopulationSizeModel, RecombinantReplicator, RecombinationParams, Replicator, Selector,
    SubstitutionModel, UniformMutator,
};
pub use crate::fitness::{FitnessFactor, FitnessFunction};
pub use crate::genome::{GenePool, Genome, GenomeId, StorageKind};
pub use crate::simulation::{Configuration, Epoch, Population, Simulation};
