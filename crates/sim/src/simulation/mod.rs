//! Simulation engine and population management.
//!
//! - `Population`: one generation of viruses plus the gene pool and the
//!   operators that produce the next generation.
//! - `Simulation`: runs a population through its epochs with a single
//!   seeded random stream, calling samplers on schedule.
//! - `Configuration`: serde description of a whole run.

pub mod configs;
pub mod engine;
pub mod population;
pub mod sampling;

pub use configs::{
    Configuration, EpochConfig, FeatureConfig, FitnessConfig, GenomeConfig, IndelConfig,
    MutatorConfig, PopulationConfig, ReplicatorConfig, SamplingConfig,
};
pub use engine::{Epoch, RunSummary, Simulation};
pub use population::{Population, Statistics, Virus};
pub use sampling::{AlignmentSampler, Sampler, StatisticsSampler};
