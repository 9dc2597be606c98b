//! Simulation engine: drives a population through its epochs.
//!
//! The engine owns the single random stream of a run, so a run is fully
//! determined by its configuration and seed.

use std::mem;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::errors::SimulationError;
use crate::evolution::{Mutator, PopulationSizeModel, Replicator};
use crate::simulation::{Population, Sampler};

/// A contiguous run of generations sharing strategy settings.
///
/// Overrides replace the population's operators when the epoch starts and
/// stay in effect for later epochs that do not override them again.
#[derive(Debug)]
pub struct Epoch {
    name: String,
    generations: usize,
    mutator: Option<Box<dyn Mutator>>,
    replicator: Option<Box<dyn Replicator>>,
    size_model: Option<PopulationSizeModel>,
}

impl Epoch {
    pub fn new(name: impl Into<String>, generations: usize) -> Self {
        Self {
            name: name.into(),
            generations,
            mutator: None,
            replicator: None,
            size_model: None,
        }
    }

    pub fn with_mutator(mut self, mutator: Box<dyn Mutator>) -> Self {
        self.mutator = Some(mutator);
        self
    }

    pub fn with_replicator(mut self, replicator: Box<dyn Replicator>) -> Self {
        self.replicator = Some(replicator);
        self
    }

    pub fn with_size_model(mut self, size_model: PopulationSizeModel) -> Self {
        self.size_model = Some(size_model);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generations(&self) -> usize {
        self.generations
    }

    fn install(&mut self, population: &mut Population) {
        if let Some(mutator) = self.mutator.take() {
            population.set_mutator(mutator);
        }
        if let Some(replicator) = self.replicator.take() {
            population.set_replicator(replicator);
        }
        if let Some(size_model) = self.size_model.take() {
            population.set_size_model(size_model);
        }
    }
}

/// Outcome of [`Simulation::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Generations advanced during the run.
    pub generations: usize,
    /// Epochs that ran to completion.
    pub epochs_completed: usize,
    pub extinct: bool,
    pub final_size: usize,
}

/// Main simulation engine.
#[derive(Debug)]
pub struct Simulation {
    population: Population,
    rng: Xoshiro256PlusPlus,
    seed: u64,
    epochs: Vec<Epoch>,
    samplers: Vec<Box<dyn Sampler>>,
    sampling_interval: usize,
    last_sampled: Option<usize>,
}

impl Simulation {
    /// Create a simulation over a seeded population.
    pub fn new(population: Population, epochs: Vec<Epoch>, seed: u64) -> Self {
        Self::from_parts(population, epochs, seed, Xoshiro256PlusPlus::seed_from_u64(seed))
    }

    /// Continue the random stream `rng` that was seeded with `seed`.
    pub(crate) fn from_parts(
        population: Population,
        epochs: Vec<Epoch>,
        seed: u64,
        rng: Xoshiro256PlusPlus,
    ) -> Self {
        Self {
            population,
            rng,
            seed,
            epochs,
            samplers: Vec::new(),
            sampling_interval: 1,
            last_sampled: None,
        }
    }

    pub fn add_sampler(&mut self, sampler: Box<dyn Sampler>) {
        self.samplers.push(sampler);
    }

    /// Sample every `interval` generations (zero disables periodic
    /// sampling; the final generation is still sampled).
    pub fn set_sampling_interval(&mut self, interval: usize) {
        self.sampling_interval = interval;
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn generation(&self) -> usize {
        self.population.generation()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    /// Generations the remaining epochs would run without extinction.
    pub fn total_generations(&self) -> usize {
        self.epochs.iter().map(Epoch::generations).sum()
    }

    fn sample(&mut self) -> Result<(), SimulationError> {
        let generation = self.population.generation();
        if self.last_sampled == Some(generation) {
            return Ok(());
        }
        for sampler in &mut self.samplers {
            sampler.sample(generation, &self.population)?;
        }
        self.last_sampled = Some(generation);
        Ok(())
    }

    /// Advance one generation and run the samplers if one is due.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        self.population.advance(&mut self.rng)?;
        let generation = self.population.generation();
        if self.sampling_interval > 0 && generation % self.sampling_interval == 0 {
            self.sample()?;
        }
        Ok(())
    }

    /// Run every epoch. See [`run_with`](Self::run_with).
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        self.run_with(|_| {})
    }

    /// Run every epoch, calling `observer` after each generation.
    ///
    /// The initial and final generations are always sampled. Extinction
    /// ends the run early. Epochs are consumed, so a second call only
    /// re-samples the final state.
    pub fn run_with(
        &mut self,
        mut observer: impl FnMut(&Population),
    ) -> Result<RunSummary, SimulationError> {
        let start = self.population.generation();
        if self.sampling_interval > 0 {
            self.sample()?;
        }

        let epochs = mem::take(&mut self.epochs);
        let mut completed = 0;
        let mut extinct = self.population.is_extinct();
        for mut epoch in epochs {
            if extinct {
                break;
            }
            log::info!(
                "epoch '{}' starting at generation {} for {} generations",
                epoch.name(),
                self.population.generation(),
                epoch.generations()
            );
            epoch.install(&mut self.population);

            for _ in 0..epoch.generations() {
                self.step()?;
                observer(&self.population);
                log::debug!(
                    "generation {}: size {}, unique genomes {}",
                    self.population.generation(),
                    self.population.size(),
                    self.population.pool().unique_genome_count()
                );
                if self.population.is_extinct() {
                    log::warn!(
                        "population went extinct at generation {}",
                        self.population.generation()
                    );
                    extinct = true;
                    break;
                }
            }
            if !extinct {
                completed += 1;
            }
        }

        self.sample()?;
        for sampler in &mut self.samplers {
            sampler.finish()?;
        }

        let summary = RunSummary {
            generations: self.population.generation() - start,
            epochs_completed: completed,
            extinct,
            final_size: self.population.size(),
        };
        log::info!(
            "finished after {} generations (extinct: {}, final size {})",
            summary.generations,
            summary.extinct,
            summary.final_size
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Sequence;
    use crate::coordinates::GenomeDescription;
    use crate::errors::SamplingError;
    use crate::evolution::{
        ClonalReplicator, FitnessProportionalSelector, NoMutation, SubstitutionModel,
        UniformMutator,
    };
    use crate::fitness::FitnessFunction;
    use crate::genome::{GenePool, StorageKind};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::str::FromStr;

    #[derive(Debug, Default)]
    struct Recorder(Rc<RefCell<Vec<usize>>>);

    impl Sampler for Recorder {
        fn sample(&mut self, generation: usize, _: &Population) -> Result<(), SamplingError> {
            self.0.borrow_mut().push(generation);
            Ok(())
        }
    }

    fn population(size: usize) -> Population {
        let seq = Sequence::from_str(&"ACGT".repeat(5)).unwrap();
        let pool = GenePool::new(seq.clone(), GenomeDescription::whole_genome(20), StorageKind::Full);
        let mut population = Population::new(
            pool,
            FitnessFunction::neutral(),
            Box::new(FitnessProportionalSelector),
            Box::new(ClonalReplicator),
            Box::new(NoMutation),
            PopulationSizeModel::Static { size },
        );
        population.seed(seq, size).unwrap();
        population
    }

    #[test]
    fn test_run_through_epochs() {
        let epochs = vec![
            Epoch::new("burn-in", 5),
            Epoch::new("mutating", 7).with_mutator(Box::new(UniformMutator::new(
                SubstitutionModel::jc69(0.05).unwrap(),
                None,
            ))),
        ];
        let mut sim = Simulation::new(population(20), epochs, 42);
        assert_eq!(sim.total_generations(), 12);
        let summary = sim.run().unwrap();
        assert_eq!(summary.generations, 12);
        assert_eq!(summary.epochs_completed, 2);
        assert!(!summary.extinct);
        assert_eq!(summary.final_size, 20);
        assert_eq!(sim.generation(), 12);
        assert!(sim.population().pool().unique_genome_count() > 1);
    }

    #[test]
    fn test_sampling_schedule() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sim = Simulation::new(population(5), vec![Epoch::new("only", 10)], 1);
        sim.add_sampler(Box::new(Recorder(Rc::clone(&log))));
        sim.set_sampling_interval(4);
        sim.run().unwrap();
        assert_eq!(*log.borrow(), vec![0, 4, 8, 10]);
    }

    #[test]
    fn test_extinction_stops_run() {
        let epochs = vec![
            Epoch::new("collapse", 3).with_size_model(PopulationSizeModel::Static { size: 0 }),
            Epoch::new("never", 5),
        ];
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sim = Simulation::new(population(5), epochs, 1);
        sim.add_sampler(Box::new(Recorder(Rc::clone(&log))));
        let summary = sim.run().unwrap();
        assert!(summary.extinct);
        assert_eq!(summary.generations, 1);
        assert_eq!(summary.epochs_completed, 0);
        assert_eq!(summary.final_size, 0);
        assert_eq!(*log.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_observer_sees_every_generation() {
        let mut seen = Vec::new();
        let mut sim = Simulation::new(population(3), vec![Epoch::new("a", 2), Epoch::new("b", 3)], 9);
        sim.run_with(|p| seen.push(p.generation())).unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let run = || {
            let mutator = UniformMutator::new(SubstitutionModel::jc69(0.02).unwrap(), None);
            let epochs = vec![Epoch::new("e", 15).with_mutator(Box::new(mutator))];
            let mut sim = Simulation::new(population(25), epochs, 2024);
            sim.run().unwrap();
            sim.population().pool().consensus_sequence().to_string()
        };
        assert_eq!(run(), run());
    }
}
