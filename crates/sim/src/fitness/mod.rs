//! Fitness model.
//!
//! Fitness is multiplicative across factors and evaluated in log space. Each
//! genome caches one contribution per factor in a [`FitnessCache`]; the
//! genome's log fitness is the sum of its cache.
//!
//! Factors that are sums over sites (purifying selection and its
//! fluctuating variant) are updated incrementally from [`StateChange`]s when
//! a genome is duplicated with substitutions. Signature-based factors and
//! any factor whose values move between generations are recomputed instead.

mod factor;
mod function;
mod population;
mod purifying;
mod signature;

pub use factor::{state_changes, FitnessFactor, StateChange};
pub use function::{FitnessCache, FitnessFunction};
pub use population::{NeutralFitness, PopulationSizeFitness};
pub use purifying::{FluctuatingFitness, PurifyingFitness, SiteFitnessTable};
pub use signature::{SignatureFitness, SignaturePolicy};
