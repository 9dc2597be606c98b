//! Genome coordinate frames.
//!
//! Fragments, features and the shared [`GenomeDescription`] that ties them to
//! a genome length. Indels never edit a description in place; they derive a
//! new one.

mod description;
mod feature;
mod fragment;

pub use description::{GenomeDescription, WHOLE_GENOME};
pub use feature::{Feature, FeatureType};
pub use fragment::{apply_indel, Fragment};
