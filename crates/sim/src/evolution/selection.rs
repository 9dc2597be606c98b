//! Parent selection and population-size dynamics.

use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::genome::GenePool;
use crate::simulation::Virus;

/// Chooses parents for the next generation.
pub trait Selector: fmt::Debug {
    /// Append `count` indices into `current` to `out`, drawn with
    /// replacement. `out` is cleared first.
    fn select_parents(
        &self,
        current: &[Virus],
        pool: &GenePool,
        out: &mut Vec<usize>,
        count: usize,
        rng: &mut dyn RngCore,
    );
}

/// Draws parents with probability proportional to their fitness.
///
/// When every virus has zero fitness (or the total is not finite) parents
/// are drawn uniformly instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitnessProportionalSelector;

impl Selector for FitnessProportionalSelector {
    fn select_parents(
        &self,
        current: &[Virus],
        pool: &GenePool,
        out: &mut Vec<usize>,
        count: usize,
        rng: &mut dyn RngCore,
    ) {
        out.clear();
        if current.is_empty() {
            return;
        }

        let mut cumulative = Vec::with_capacity(current.len());
        let mut total = 0.0;
        for virus in current {
            total += pool
                .genome(virus.genome)
                .map_or(0.0, |genome| genome.fitness());
            cumulative.push(total);
        }

        if total <= 0.0 || !total.is_finite() {
            log::debug!("all parents have zero fitness, selecting uniformly");
            out.extend((0..count).map(|_| rng.random_range(0..current.len())));
            return;
        }

        let last = current.len() - 1;
        out.extend((0..count).map(|_| {
            let target = rng.random::<f64>() * total;
            cumulative.partition_point(|&c| c <= target).min(last)
        }));
    }
}

/// Upper bound on any generation's size; size models never ask for more.
pub const MAX_POPULATION_SIZE: usize = 10_000_000;

/// How the number of offspring changes from one generation to the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum PopulationSizeModel {
    /// The same number of offspring every generation.
    Static { size: usize },
    /// `N' = round(N * exp(r))`, optionally capped.
    Exponential {
        growth_rate: f64,
        #[serde(default)]
        max_size: Option<usize>,
    },
    /// Discrete logistic growth towards `carrying_capacity`.
    Logistic {
        growth_rate: f64,
        carrying_capacity: usize,
    },
}

impl PopulationSizeModel {
    /// Offspring count for a generation whose parents number `current`,
    /// at most [`MAX_POPULATION_SIZE`].
    pub fn target_size(&self, current: usize) -> usize {
        self.unbounded_target(current).min(MAX_POPULATION_SIZE)
    }

    fn unbounded_target(&self, current: usize) -> usize {
        match *self {
            Self::Static { size } => size,
            Self::Exponential {
                growth_rate,
                max_size,
            } => {
                let next = (current as f64 * growth_rate.exp()).round();
                let next = if next.is_finite() { next as usize } else { usize::MAX };
                max_size.map_or(next, |cap| next.min(cap))
            }
            Self::Logistic {
                growth_rate,
                carrying_capacity,
            } => {
                if carrying_capacity == 0 {
                    return 0;
                }
                let n = current as f64;
                let k = carrying_capacity as f64;
                let next = n + growth_rate * n * (1.0 - n / k);
                next.round().max(0.0) as usize
            }
        }
    }

    /// Whether the model's parameters make sense.
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Static { size } => size <= MAX_POPULATION_SIZE,
            Self::Exponential {
                growth_rate,
                max_size,
            } => growth_rate.is_finite() && max_size.map_or(true, |cap| cap <= MAX_POPULATION_SIZE),
            Self::Logistic {
                growth_rate,
                carrying_capacity,
            } => {
                growth_rate.is_finite()
                    && growth_rate >= 0.0
                    && carrying_capacity <= MAX_POPULATION_SIZE
            }
        }
    }
}

impl Default for PopulationSizeModel {
    fn default() -> Self {
        Self::Static { size: 1000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{Nucleotide, Sequence};
    use crate::coordinates::GenomeDescription;
    use crate::evolution::{Mutation, MutationSet};
    use crate::fitness::{FitnessFunction, PurifyingFitness, SiteFitnessTable};
    use crate::genome::StorageKind;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::str::FromStr;

    /// One fit virus (AA) and one lethal virus (CA).
    fn pool_with_lethal() -> (GenePool, Vec<Virus>) {
        let seq = Sequence::from_str("AA").unwrap();
        let root = GenomeDescription::whole_genome(2);
        let table = SiteFitnessTable::from_reference(4, &[0, 0], 1.0).unwrap();
        let fitness = FitnessFunction::new(vec![Box::new(PurifyingFitness::new("p", 0, table))]);
        let mut pool = GenePool::new(seq.clone(), root.clone(), StorageKind::Full);
        let fit = pool.create_genome(seq, root, &fitness);
        let lethal: MutationSet = [Mutation::Substitution {
            position: 0,
            state: Nucleotide::C,
        }]
        .into_iter()
        .collect();
        let dead = pool.duplicate_genome(fit, &lethal, &fitness).unwrap();
        let viruses = vec![Virus::new(dead, None), Virus::new(fit, None)];
        (pool, viruses)
    }

    #[test]
    fn test_zero_fitness_never_selected() {
        let (pool, viruses) = pool_with_lethal();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let mut out = Vec::new();
        FitnessProportionalSelector.select_parents(&viruses, &pool, &mut out, 500, &mut rng);
        assert_eq!(out.len(), 500);
        assert!(out.iter().all(|&i| i == 1));
    }

    #[test]
    fn test_selection_is_proportional() {
        let seq = Sequence::from_str("AA").unwrap();
        let root = GenomeDescription::whole_genome(2);
        let table = SiteFitnessTable::from_reference(4, &[0, 0], 0.75).unwrap();
        let fitness = FitnessFunction::new(vec![Box::new(PurifyingFitness::new("p", 0, table))]);
        let mut pool = GenePool::new(seq.clone(), root.clone(), StorageKind::Full);
        let strong = pool.create_genome(seq, root, &fitness);
        let weak_set: MutationSet = [Mutation::Substitution {
            position: 1,
            state: Nucleotide::G,
        }]
        .into_iter()
        .collect();
        let weak = pool.duplicate_genome(strong, &weak_set, &fitness).unwrap();
        // Fitness 1.0 vs 0.25.
        let viruses = vec![Virus::new(strong, None), Virus::new(weak, None)];

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut out = Vec::new();
        FitnessProportionalSelector.select_parents(&viruses, &pool, &mut out, 10_000, &mut rng);
        let share = out.iter().filter(|&&i| i == 0).count() as f64 / 10_000.0;
        assert!((share - 0.8).abs() < 0.02, "strong share {share}");
    }

    #[test]
    fn test_all_lethal_selects_uniformly() {
        let (pool, viruses) = pool_with_lethal();
        let only_dead = &viruses[..1];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let mut out = vec![99];
        FitnessProportionalSelector.select_parents(only_dead, &pool, &mut out, 3, &mut rng);
        assert_eq!(out, vec![0, 0, 0]);
    }

    #[test]
    fn test_empty_generation_selects_nothing() {
        let (pool, _) = pool_with_lethal();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let mut out = Vec::new();
        FitnessProportionalSelector.select_parents(&[], &pool, &mut out, 10, &mut rng);
        assert!(out.is_empty());
    }

    #[test]
    fn test_population_size_models() {
        assert_eq!(PopulationSizeModel::Static { size: 50 }.target_size(10), 50);

        let growth = PopulationSizeModel::Exponential {
            growth_rate: 2f64.ln(),
            max_size: Some(300),
        };
        assert_eq!(growth.target_size(100), 200);
        assert_eq!(growth.target_size(200), 300);

        let logistic = PopulationSizeModel::Logistic {
            growth_rate: 0.5,
            carrying_capacity: 1000,
        };
        assert_eq!(logistic.target_size(1000), 1000);
        assert_eq!(logistic.target_size(500), 625);
        assert!(logistic.target_size(1200) < 1200);
    }

    #[test]
    fn test_runaway_growth_is_capped() {
        let runaway = PopulationSizeModel::Exponential {
            growth_rate: 60.0,
            max_size: None,
        };
        assert!(runaway.is_valid());
        assert_eq!(runaway.target_size(2), MAX_POPULATION_SIZE);
        assert_eq!(runaway.target_size(usize::MAX), MAX_POPULATION_SIZE);

        let overshoot = PopulationSizeModel::Logistic {
            growth_rate: 1e9,
            carrying_capacity: 100,
        };
        assert_eq!(overshoot.target_size(50), MAX_POPULATION_SIZE);

        assert!(!PopulationSizeModel::Static {
            size: MAX_POPULATION_SIZE + 1
        }
        .is_valid());
        assert!(!PopulationSizeModel::Exponential {
            growth_rate: 0.1,
            max_size: Some(usize::MAX)
        }
        .is_valid());
    }

    #[test]
    fn test_size_model_from_json() {
        let model: PopulationSizeModel =
            serde_json::from_str(r#"{"model": "logistic", "growth_rate": 0.1, "carrying_capacity": 10}"#)
                .unwrap();
        assert_eq!(
            model,
            PopulationSizeModel::Logistic {
                growth_rate: 0.1,
                carrying_capacity: 10
            }
        );
    }
}
