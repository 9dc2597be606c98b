use rand::RngCore;

use super::factor::{state_changes, FitnessFactor};
use crate::errors::FitnessError;
use crate::evolution::MutationSet;
use crate::genome::{GenePool, Genome};

/// Per-genome contributions of each fitness factor, in factor order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitnessCache(Vec<f64>);

impl FitnessCache {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Contribution of factor `index`, zero if the cache is shorter.
    pub fn get(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Sum of all contributions: the genome's log fitness.
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    fn reset(&mut self, len: usize) {
        self.0.clear();
        self.0.resize(len, 0.0);
    }

    fn set(&mut self, index: usize, value: f64) {
        if self.0.len() <= index {
            self.0.resize(index + 1, 0.0);
        }
        self.0[index] = value;
    }
}

/// The product of all fitness factors.
///
/// Holds the factors and, between `update_generation` calls, the flags of
/// the factors whose values changed for existing genomes.
#[derive(Debug, Default)]
pub struct FitnessFunction {
    factors: Vec<Box<dyn FitnessFactor>>,
    recompute: Vec<bool>,
}

impl FitnessFunction {
    pub fn new(factors: Vec<Box<dyn FitnessFactor>>) -> Self {
        let recompute = vec![false; factors.len()];
        Self { factors, recompute }
    }

    /// No factors: every genome has log fitness zero.
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn factors(&self) -> &[Box<dyn FitnessFactor>] {
        &self.factors
    }

    /// Whether factor `index` was flagged by the last `update_generation`.
    pub fn needs_recompute(&self, index: usize) -> bool {
        self.recompute.get(index).copied().unwrap_or(false)
    }

    /// Advance every factor to `generation`. Returns `true` if any factor
    /// was flagged for recomputation.
    pub fn update_generation(
        &mut self,
        generation: usize,
        pool: &GenePool,
        rng: &mut dyn RngCore,
    ) -> bool {
        let mut any = false;
        for (factor, flag) in self.factors.iter_mut().zip(self.recompute.iter_mut()) {
            *flag = factor.update_generation(generation, pool, rng);
            if *flag {
                log::trace!("fitness factor '{}' changed at generation {generation}", factor.name());
            }
            any |= *flag;
        }
        any
    }

    fn factor_value(factor: &dyn FitnessFactor, genome: &Genome, states: &mut Vec<u8>) -> f64 {
        match factor.feature() {
            Some(feature) => genome.feature_states(feature, states),
            None => states.clear(),
        }
        factor.compute_log_fitness(states)
    }

    /// Recompute every factor's contribution and the log fitness.
    pub fn compute_full(&self, genome: &mut Genome) {
        let mut states = Vec::new();
        genome.fitness_cache_mut().reset(self.factors.len());
        for (index, factor) in self.factors.iter().enumerate() {
            let value = Self::factor_value(factor.as_ref(), genome, &mut states);
            genome.fitness_cache_mut().set(index, value);
        }
        genome.sync_log_fitness();
    }

    /// Recompute one factor's contribution without touching log fitness.
    pub(crate) fn recompute_factor(&self, genome: &mut Genome, index: usize) {
        if let Some(factor) = self.factors.get(index) {
            let mut states = Vec::new();
            let value = Self::factor_value(factor.as_ref(), genome, &mut states);
            genome.fitness_cache_mut().set(index, value);
        }
    }

    /// Recompute the factors flagged by the last `update_generation`.
    pub fn refresh_flagged(&self, genome: &mut Genome) {
        let mut states = Vec::new();
        for (index, factor) in self.factors.iter().enumerate() {
            if self.recompute[index] {
                let value = Self::factor_value(factor.as_ref(), genome, &mut states);
                genome.fitness_cache_mut().set(index, value);
            }
        }
        genome.sync_log_fitness();
    }

    /// Add the deltas of incremental factors to `genome`'s cache, reading
    /// pre-mutation states. Returns the factors that must instead be
    /// recomputed once the mutations are applied.
    pub(crate) fn apply_deltas(
        &self,
        genome: &mut Genome,
        mutations: &MutationSet,
    ) -> Result<Vec<usize>, FitnessError> {
        let mut stale = Vec::new();
        let mut changes = Vec::new();
        for (index, factor) in self.factors.iter().enumerate() {
            let Some(feature) = factor.feature() else {
                continue;
            };
            changes.clear();
            state_changes(genome, feature, mutations, &mut changes)?;
            if changes.is_empty() {
                continue;
            }
            let current = genome.fitness_cache().get(index);
            if !factor.is_incremental() || !current.is_finite() {
                stale.push(index);
                continue;
            }
            let delta: f64 = changes.iter().map(|c| factor.log_fitness_change(c)).sum();
            if delta.is_finite() {
                genome.fitness_cache_mut().set(index, current + delta);
            } else {
                stale.push(index);
            }
        }
        Ok(stale)
    }
}
