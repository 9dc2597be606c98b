//! The population of viruses and the generational update.
//!
//! A [`Population`] owns the gene pool and the operator strategies, and
//! holds two [`Virus`] buffers: the current generation and the previous
//! one. Advancing swaps the buffers, fills the current one with offspring
//! and releases the previous generation's genomes back to the pool.

use std::cell::OnceCell;
use std::mem;

use rand::RngCore;

use crate::base::Sequence;
use crate::errors::{GenePoolError, SimulationError};
use crate::evolution::{MutationSet, Mutator, PopulationSizeModel, Replicator, Selector};
use crate::fitness::FitnessFunction;
use crate::genome::{GenePool, GenomeId, MISSING_STATE};

/// Unique genomes beyond which mean pairwise distance is estimated from an
/// evenly spaced subset.
const MAX_DISTANCE_GENOMES: usize = 200;

/// One slot of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Virus {
    pub genome: GenomeId,
    /// Index of the first parent in the previous generation.
    pub parent: Option<usize>,
}

impl Virus {
    pub fn new(genome: GenomeId, parent: Option<usize>) -> Self {
        Self { genome, parent }
    }
}

/// Summary statistics of one generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub mean_fitness: f64,
    pub min_fitness: f64,
    pub max_fitness: f64,
    /// Mean pairwise Hamming distance between viruses.
    pub mean_distance: f64,
    /// Share of the population carrying the most common genome.
    pub max_frequency: f64,
    /// Probability that two viruses drawn with replacement carry different
    /// genomes.
    pub diversity: f64,
}

impl Statistics {
    const EMPTY: Self = Self {
        mean_fitness: 0.0,
        min_fitness: 0.0,
        max_fitness: 0.0,
        mean_distance: 0.0,
        max_frequency: 0.0,
        diversity: 0.0,
    };

    fn compute(pool: &GenePool) -> Self {
        let n = pool.population_size();
        if n == 0 {
            return Self::EMPTY;
        }
        let total = n as f64;

        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut top = 0;
        let mut homozygosity = 0.0;
        for (_, genome) in pool.live_genomes() {
            let copies = genome.frequency();
            let fitness = genome.fitness();
            sum += fitness * copies as f64;
            min = min.min(fitness);
            max = max.max(fitness);
            top = top.max(copies);
            let share = copies as f64 / total;
            homozygosity += share * share;
        }

        Self {
            mean_fitness: sum / total,
            min_fitness: min,
            max_fitness: max,
            mean_distance: mean_distance(pool),
            max_frequency: top as f64 / total,
            diversity: 1.0 - homozygosity,
        }
    }
}

/// Frequency-weighted mean distance over pairs of distinct viruses.
fn mean_distance(pool: &GenePool) -> f64 {
    let genomes: Vec<_> = pool.live_genomes().map(|(_, g)| g).collect();
    let step = genomes.len().div_ceil(MAX_DISTANCE_GENOMES).max(1);
    let subset: Vec<_> = genomes.into_iter().step_by(step).collect();

    let copies: usize = subset.iter().map(|g| g.frequency()).sum();
    if copies < 2 {
        return 0.0;
    }
    let mut weighted = 0.0;
    for (i, a) in subset.iter().enumerate() {
        for b in &subset[i + 1..] {
            weighted += (a.frequency() * b.frequency()) as f64 * a.hamming_distance(b) as f64;
        }
    }
    let pairs = (copies * (copies - 1) / 2) as f64;
    weighted / pairs
}

/// A population evolving under a fixed set of operators.
#[derive(Debug)]
pub struct Population {
    current: Vec<Virus>,
    previous: Vec<Virus>,
    parents: Vec<usize>,
    pool: GenePool,
    selector: Box<dyn Selector>,
    replicator: Box<dyn Replicator>,
    mutator: Box<dyn Mutator>,
    fitness: FitnessFunction,
    size_model: PopulationSizeModel,
    generation: usize,
    statistics: OnceCell<Statistics>,
}

impl Population {
    pub fn new(
        pool: GenePool,
        fitness: FitnessFunction,
        selector: Box<dyn Selector>,
        replicator: Box<dyn Replicator>,
        mutator: Box<dyn Mutator>,
        size_model: PopulationSizeModel,
    ) -> Self {
        Self {
            current: Vec::new(),
            previous: Vec::new(),
            parents: Vec::new(),
            pool,
            selector,
            replicator,
            mutator,
            fitness,
            size_model,
            generation: 0,
            statistics: OnceCell::new(),
        }
    }

    /// Fill generation zero with `size` copies of `sequence`, in the pool's
    /// root frame. Any previous contents are released first.
    pub fn seed(&mut self, sequence: Sequence, size: usize) -> Result<(), GenePoolError> {
        for virus in self.current.drain(..) {
            self.pool.kill_genome(virus.genome)?;
        }
        self.generation = 0;
        self.statistics.take();
        if size == 0 {
            return Ok(());
        }

        let root = self.pool.root_description().clone();
        let founder = self.pool.create_genome(sequence, root, &self.fitness);
        self.current.push(Virus::new(founder, None));
        let none = MutationSet::new();
        for _ in 1..size {
            let id = self.pool.duplicate_genome(founder, &none, &self.fitness)?;
            self.current.push(Virus::new(id, None));
        }
        log::debug!("seeded population with {size} copies of a {} bp genome", self.pool.master().len());
        Ok(())
    }

    /// Advance one generation.
    ///
    /// Fitness factors are updated first, then the offspring count is taken
    /// from the size model, parents are selected and replicated, and the
    /// previous generation's genomes are released. An empty current
    /// generation produces an empty next generation.
    pub fn advance(&mut self, rng: &mut dyn RngCore) -> Result<(), SimulationError> {
        let next = self.generation + 1;
        if self.fitness.update_generation(next, &self.pool, rng) {
            self.pool.refresh_fitness(&self.fitness);
        }

        let target = if self.current.is_empty() {
            0
        } else {
            self.size_model.target_size(self.current.len())
        };
        let per_offspring = self.replicator.parent_count();
        let draws = target
            .checked_mul(per_offspring)
            .ok_or(SimulationError::PopulationOverflow {
                generation: next,
                offspring: target,
                parents: per_offspring,
            })?;
        self.selector
            .select_parents(&self.current, &self.pool, &mut self.parents, draws, rng);

        mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();

        let mut parent_ids = Vec::with_capacity(per_offspring);
        for chunk in self.parents.chunks_exact(per_offspring) {
            parent_ids.clear();
            parent_ids.extend(chunk.iter().map(|&i| self.previous[i].genome));
            let child = self.replicator.replicate(
                &parent_ids,
                self.mutator.as_ref(),
                &self.fitness,
                &mut self.pool,
                rng,
            )?;
            self.current.push(Virus::new(child, Some(chunk[0])));
        }

        for virus in &self.previous {
            self.pool.kill_genome(virus.genome)?;
        }

        self.generation = next;
        self.statistics.take();
        Ok(())
    }

    pub fn set_mutator(&mut self, mutator: Box<dyn Mutator>) {
        self.mutator = mutator;
    }

    pub fn set_replicator(&mut self, replicator: Box<dyn Replicator>) {
        self.replicator = replicator;
    }

    pub fn set_size_model(&mut self, size_model: PopulationSizeModel) {
        self.size_model = size_model;
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn size(&self) -> usize {
        self.current.len()
    }

    pub fn is_extinct(&self) -> bool {
        self.current.is_empty()
    }

    pub fn current_generation(&self) -> &[Virus] {
        &self.current
    }

    pub fn previous_generation(&self) -> &[Virus] {
        &self.previous
    }

    pub fn pool(&self) -> &GenePool {
        &self.pool
    }

    #[cfg(test)]
    pub(crate) fn pool_mut(&mut self) -> &mut GenePool {
        &mut self.pool
    }

    pub fn fitness_function(&self) -> &FitnessFunction {
        &self.fitness
    }

    pub fn size_model(&self) -> &PopulationSizeModel {
        &self.size_model
    }

    /// Statistics of the current generation, computed on first use.
    pub fn statistics(&self) -> &Statistics {
        self.statistics.get_or_init(|| Statistics::compute(&self.pool))
    }

    pub fn mean_fitness(&self) -> f64 {
        self.statistics().mean_fitness
    }

    pub fn min_fitness(&self) -> f64 {
        self.statistics().min_fitness
    }

    pub fn max_fitness(&self) -> f64 {
        self.statistics().max_fitness
    }

    pub fn mean_distance(&self) -> f64 {
        self.statistics().mean_distance
    }

    pub fn max_frequency(&self) -> f64 {
        self.statistics().max_frequency
    }

    pub fn diversity(&self) -> f64 {
        self.statistics().diversity
    }

    /// Frequency of each state at each of `sites` within `feature`, one row
    /// per site. Viruses whose genome no longer covers a site are left out
    /// of that site's denominator.
    pub fn allele_frequencies(&self, feature: usize, sites: &[usize]) -> Vec<Vec<f64>> {
        let alphabet = self
            .pool
            .root_description()
            .feature(feature)
            .map_or(0, |f| f.feature_type().alphabet_size());
        let mut counts = vec![vec![0usize; alphabet]; sites.len()];
        let mut covered = vec![0usize; sites.len()];
        let mut states = Vec::with_capacity(sites.len());

        for (_, genome) in self.pool.live_genomes() {
            genome.site_states(feature, sites, &mut states);
            for (row, &state) in states.iter().enumerate() {
                if state == MISSING_STATE || state as usize >= alphabet {
                    continue;
                }
                counts[row][state as usize] += genome.frequency();
                covered[row] += genome.frequency();
            }
        }

        counts
            .into_iter()
            .zip(covered)
            .map(|(row, total)| {
                row.into_iter()
                    .map(|c| if total == 0 { 0.0 } else { c as f64 / total as f64 })
                    .collect()
            })
            .collect()
    }
}
