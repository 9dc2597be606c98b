//! # Simulation Crate
//!
//! `santa_sim` is a forward-time simulator of a population of virus
//! genomes evolving under mutation, recombination and selection.
//!
//! - [`genome`]: genome storage (full or diff against a master sequence)
//!   and the gene pool that shares identical genomes between viruses.
//! - [`coordinates`]: features and their fragments, kept consistent as
//!   indels change genome length.
//! - [`fitness`]: composite log fitness with per-genome caches.
//! - [`evolution`]: mutation, replication and selection strategies.
//! - [`simulation`]: the population update loop, epochs, samplers and
//!   configuration.

pub mod base;
pub mod coordinates;
pub mod errors;
pub mod evolution;
pub mod fitness;
pub mod genome;
pub mod prelude;
pub mod simulation;

pub use base::{Nucleotide, Sequence, SharedSequence};
