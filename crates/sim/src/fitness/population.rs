use rand::RngCore;

use super::factor::{FitnessFactor, StateChange};
use crate::errors::FitnessError;
use crate::genome::GenePool;

/// Contributes nothing. Useful as a placeholder in configurations.
#[derive(Debug, Clone, Default)]
pub struct NeutralFitness;

impl FitnessFactor for NeutralFitness {
    fn name(&self) -> &str {
        "neutral"
    }

    fn feature(&self) -> Option<usize> {
        None
    }

    fn compute_log_fitness(&self, _states: &[u8]) -> f64 {
        0.0
    }

    fn log_fitness_change(&self, _change: &StateChange) -> f64 {
        0.0
    }

    fn update_generation(&mut self, _: usize, _: &GenePool, _: &mut dyn RngCore) -> bool {
        false
    }
}

/// Density-dependent fitness shared by every genome: `ln(K / (K + N))`
/// for carrying capacity `K` and current population size `N`.
#[derive(Debug, Clone)]
pub struct PopulationSizeFitness {
    carrying_capacity: f64,
    population_size: usize,
}

impl PopulationSizeFitness {
    pub fn new(carrying_capacity: f64) -> Result<Self, FitnessError> {
        if !(carrying_capacity.is_finite() && carrying_capacity > 0.0) {
            return Err(FitnessError::InvalidParameter(format!(
                "carrying capacity must be positive, got {carrying_capacity}"
            )));
        }
        Ok(Self {
            carrying_capacity,
            population_size: 0,
        })
    }

    pub fn log_fitness_at(&self, population_size: usize) -> f64 {
        let k = self.carrying_capacity;
        (k / (k + population_size as f64)).ln()
    }
}

impl FitnessFactor for PopulationSizeFitness {
    fn name(&self) -> &str {
        "population_size"
    }

    fn feature(&self) -> Option<usize> {
        None
    }

    fn compute_log_fitness(&self, _states: &[u8]) -> f64 {
        self.log_fitness_at(self.population_size)
    }

    fn log_fitness_change(&self, _change: &StateChange) -> f64 {
        0.0
    }

    fn update_generation(&mut self, _: usize, pool: &GenePool, _: &mut dyn RngCore) -> bool {
        let size = pool.population_size();
        let changed = size != self.population_size;
        self.population_size = size;
        changed
    }
}
