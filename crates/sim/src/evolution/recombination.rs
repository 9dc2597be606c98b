//! Replication of genomes, with or without recombination.
//!
//! A [`Replicator`] turns selected parents into one offspring genome in the
//! gene pool, drawing that offspring's mutations from a [`Mutator`]. Every
//! replication ends in exactly one `duplicate_genome` or create call on the
//! pool.

use std::fmt;
use std::iter;
use std::sync::Arc;

use rand::{Rng, RngCore};
use rand_distr::Geometric;
use serde::{Deserialize, Serialize};

use super::mutation::{apply_mutations, derive_description, validate_mutations, Mutator};
use crate::base::Sequence;
pub use crate::errors::RecombinationError;
use crate::errors::GenePoolError;
use crate::fitness::FitnessFunction;
use crate::genome::{GenePool, GenomeId};

/// Produces one offspring genome from `parent_count()` parents.
pub trait Replicator: fmt::Debug {
    fn parent_count(&self) -> usize;

    /// Replicate `parents` (exactly `parent_count()` ids) into a new
    /// offspring and return its id.
    fn replicate(
        &self,
        parents: &[GenomeId],
        mutator: &dyn Mutator,
        fitness: &FitnessFunction,
        pool: &mut GenePool,
        rng: &mut dyn RngCore,
    ) -> Result<GenomeId, GenePoolError>;
}

/// Copy `parent` with fresh mutations.
fn replicate_clonally(
    parent: GenomeId,
    mutator: &dyn Mutator,
    fitness: &FitnessFunction,
    pool: &mut GenePool,
    rng: &mut dyn RngCore,
) -> Result<GenomeId, GenePoolError> {
    let mutations = mutator.mutate(pool.genome(parent)?, rng);
    pool.duplicate_genome(parent, &mutations, fitness)
}

/// Asexual replication: one parent, copied with mutations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClonalReplicator;

impl Replicator for ClonalReplicator {
    fn parent_count(&self) -> usize {
        1
    }

    fn replicate(
        &self,
        parents: &[GenomeId],
        mutator: &dyn Mutator,
        fitness: &FitnessFunction,
        pool: &mut GenePool,
        rng: &mut dyn RngCore,
    ) -> Result<GenomeId, GenePoolError> {
        replicate_clonally(parents[0], mutator, fitness, pool, rng)
    }
}

/// A region where template switches are more likely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// First position of the region.
    pub start: usize,
    /// One past the last position.
    pub end: usize,
    /// Multiplier applied to the breakpoint probability inside the region.
    pub boost: f64,
}

/// Parameters controlling recombination.
///
/// `recombination_probability` is the chance that a replication with two
/// distinct parents recombines at all. Given that it does, every boundary
/// between adjacent sites independently becomes a breakpoint with
/// `breakpoint_probability`, scaled by the boost of any hotspot containing
/// the site after the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecombinationParams {
    recombination_probability: f64,
    breakpoint_probability: f64,
    #[serde(default)]
    hotspots: Vec<Hotspot>,
}

impl RecombinationParams {
    /// # Errors
    /// Returns an error if a probability lies outside `[0, 1]` or a hotspot
    /// is empty or has a negative boost.
    pub fn new(
        recombination_probability: f64,
        breakpoint_probability: f64,
        hotspots: Vec<Hotspot>,
    ) -> Result<Self, RecombinationError> {
        if !(0.0..=1.0).contains(&recombination_probability) {
            return Err(RecombinationError::InvalidProbability(
                "recombination_probability",
                recombination_probability,
            ));
        }
        if !(0.0..=1.0).contains(&breakpoint_probability) {
            return Err(RecombinationError::InvalidProbability(
                "breakpoint_probability",
                breakpoint_probability,
            ));
        }
        if let Some(h) = hotspots
            .iter()
            .find(|h| h.start >= h.end || !h.boost.is_finite() || h.boost < 0.0)
        {
            return Err(RecombinationError::InvalidHotspot {
                start: h.start,
                end: h.end,
                boost: h.boost,
            });
        }

        Ok(Self {
            recombination_probability,
            breakpoint_probability,
            hotspots,
        })
    }

    #[inline]
    pub fn recombination_probability(&self) -> f64 {
        self.recombination_probability
    }

    #[inline]
    pub fn breakpoint_probability(&self) -> f64 {
        self.breakpoint_probability
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    /// Breakpoint probability before `position`.
    pub fn site_probability(&self, position: usize) -> f64 {
        let boost = self
            .hotspots
            .iter()
            .filter(|h| (h.start..h.end).contains(&position))
            .fold(1.0f64, |acc, h| acc.max(h.boost));
        (self.breakpoint_probability * boost).min(1.0)
    }

    fn max_probability(&self) -> f64 {
        let boost = self.hotspots.iter().fold(1.0f64, |acc, h| acc.max(h.boost));
        (self.breakpoint_probability * boost).min(1.0)
    }

    /// Sample ascending breakpoints for a genome of `length` sites. A
    /// breakpoint `b` switches templates between sites `b - 1` and `b`, so
    /// every breakpoint lies in `1..length`.
    ///
    /// Uses geometric skipping at the highest site probability and thins
    /// each candidate down to its own probability.
    pub fn sample_breakpoints<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Vec<usize> {
        let mut breakpoints = Vec::new();
        let max_p = self.max_probability();
        if length < 2 || max_p <= 0.0 {
            return breakpoints;
        }

        if max_p >= 1.0 {
            for position in 1..length {
                if rng.random_bool(self.site_probability(position)) {
                    breakpoints.push(position);
                }
            }
            return breakpoints;
        }

        let Ok(geo) = Geometric::new(max_p) else {
            return breakpoints;
        };
        let mut position: usize = 1;
        loop {
            let skip: u64 = rng.sample(geo);
            position = position.saturating_add(skip as usize);
            if position >= length {
                break;
            }
            if rng.random_bool(self.site_probability(position) / max_p) {
                breakpoints.push(position);
            }
            position += 1;
        }
        breakpoints
    }
}

/// Two-parent replication with template switching.
///
/// Falls back to clonal replication of the first parent when the parents
/// are the same genome, when no recombination is drawn, or when the parents
/// no longer share a coordinate frame (after diverging indels).
#[derive(Debug, Clone, PartialEq)]
pub struct RecombinantReplicator {
    params: RecombinationParams,
}

impl RecombinantReplicator {
    pub fn new(params: RecombinationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RecombinationParams {
        &self.params
    }
}

impl Replicator for RecombinantReplicator {
    fn parent_count(&self) -> usize {
        2
    }

    fn replicate(
        &self,
        parents: &[GenomeId],
        mutator: &dyn Mutator,
        fitness: &FitnessFunction,
        pool: &mut GenePool,
        rng: &mut dyn RngCore,
    ) -> Result<GenomeId, GenePoolError> {
        let (first, second) = (parents[0], parents[1]);
        if first == second || !rng.random_bool(self.params.recombination_probability) {
            return replicate_clonally(first, mutator, fitness, pool, rng);
        }

        let (a, b) = (pool.genome(first)?, pool.genome(second)?);
        if !a.description().same_frame(b.description()) {
            log::trace!("parents {first} and {second} differ in frame, replicating clonally");
            return replicate_clonally(first, mutator, fitness, pool, rng);
        }

        let length = a.len();
        let breakpoints = self.params.sample_breakpoints(length, rng);
        if breakpoints.is_empty() {
            return replicate_clonally(first, mutator, fitness, pool, rng);
        }

        // Either parent may provide the leading segment.
        let (lead, other) = if rng.random_bool(0.5) { (b, a) } else { (a, b) };
        let mut sequence = Sequence::with_capacity(length);
        let mut start = 0;
        for (segment, &end) in breakpoints.iter().chain(iter::once(&length)).enumerate() {
            let template = if segment % 2 == 0 { lead } else { other };
            sequence.extend_from_source(template, start..end);
            start = end;
        }
        let inherited = a.total_mutation_count().max(b.total_mutation_count());
        let frame = Arc::clone(a.description());

        let mutations = mutator.mutate(&sequence, rng);
        validate_mutations(&mutations)?;
        apply_mutations(&mut sequence, &mutations);
        let frame = derive_description(&frame, &mutations);
        Ok(pool.create_recombinant(sequence, frame, inherited + mutations.len(), fitness))
    }
}
