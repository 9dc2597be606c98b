//! Genomes and the gene pool that owns them.
//!
//! A [`Genome`] is a distinct genotype together with its coordinate frame,
//! its frequency in the population and its cached fitness. Genomes are
//! stored either in full or as differences from a shared master sequence
//! (see [`StorageKind`]); both behave identically through the public API.

mod pool;
mod record;
mod storage;

pub use pool::{GenePool, GenomeId, StateFrequencies};
pub use record::{Genome, MISSING_STATE};
pub use storage::{DiffSequence, GenomeStorage, StorageKind};
