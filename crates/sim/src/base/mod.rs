//! Base types for sequence representation.
//!
//! Nucleotide and amino-acid alphabets, mutable and shared sequences, and the
//! generational arena that backs the gene pool.

mod amino_acid;
mod arena;
mod nucleotide;
mod sequence;

pub use amino_acid::AminoAcid;
pub use arena::{Arena, Handle};
pub use nucleotide::Nucleotide;
pub use sequence::{Sequence, SharedSequence, StateSource};
