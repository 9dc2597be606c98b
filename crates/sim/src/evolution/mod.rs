//! Evolutionary operators: mutation, replication (clonal or recombinant)
//! and parent selection.
//!
//! Each operator is a trait ([`Mutator`], [`Replicator`], [`Selector`]) so
//! a population can switch strategies between epochs.

pub mod mutation;
pub mod recombination;
pub mod selection;

pub use mutation::{
    apply_mutations, derive_description, has_indel, IndelModel, Mutation, MutationError,
    MutationSet, Mutator, NoMutation, SubstitutionModel, UniformMutator, validate_mutations,
};
pub use recombination::{
    ClonalReplicator, Hotspot, RecombinantReplicator, RecombinationError, RecombinationParams,
    Replicator,
};
pub use selection::{
    FitnessProportionalSelector, PopulationSizeModel, Selector, MAX_POPULATION_SIZE,
};
