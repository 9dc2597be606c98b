//! Declarative simulation configuration.
//!
//! A [`Configuration`] deserializes from JSON and fully describes a run:
//! the founding genome and its features, the fitness factors, the mutation
//! and replication strategies, the demographic schedule (epochs) and the
//! sampling interval. [`Simulation::from_config`] validates it and builds
//! the engine.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::base::{Sequence, SharedSequence};
use crate::coordinates::{Feature, FeatureType, Fragment, GenomeDescription, WHOLE_GENOME};
use crate::errors::{ConfigError, CoordinateError, FitnessError};
use crate::evolution::{
    ClonalReplicator, FitnessProportionalSelector, Hotspot, IndelModel, Mutator, NoMutation,
    PopulationSizeModel, RecombinantReplicator, RecombinationParams, Replicator,
    SubstitutionModel, UniformMutator,
};
use crate::fitness::{
    FitnessFactor, FitnessFunction, FluctuatingFitness, NeutralFitness, PopulationSizeFitness,
    PurifyingFitness, SignatureFitness, SignaturePolicy, SiteFitnessTable,
};
use crate::genome::{GenePool, Genome, GenomeStorage, StorageKind};
use crate::simulation::{Epoch, Population, Simulation};

/// The master configuration struct.
/// Can be deserialized from a file to fully reproduce a simulation setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// RNG seed; drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    pub population: PopulationConfig,
    pub genome: GenomeConfig,
    #[serde(default)]
    pub fitness: Vec<FitnessConfig>,
    #[serde(default)]
    pub mutator: Option<MutatorConfig>,
    #[serde(default)]
    pub replicator: ReplicatorConfig,
    pub epochs: Vec<EpochConfig>,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub initial_size: usize,
    /// Defaults to a static population of `initial_size`.
    #[serde(default)]
    pub size_model: Option<PopulationSizeModel>,
}

/// The founding genome: an explicit sequence or a random one of given
/// length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeConfig {
    #[serde(default)]
    pub sequence: Option<String>,
    #[serde(default)]
    pub random_length: Option<usize>,
    #[serde(default)]
    pub storage: StorageKind,
    #[serde(default)]
    pub features: Vec<FeatureConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub name: String,
    #[serde(default, rename = "type")]
    pub feature_type: FeatureType,
    /// Half-open `[start, end)` genome ranges.
    pub fragments: Vec<[usize; 2]>,
}

fn default_feature() -> String {
    WHOLE_GENOME.to_string()
}

/// One fitness factor. `feature` names the feature the factor reads; the
/// implicit `"genome"` feature spans the whole founding genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitnessConfig {
    Neutral,
    /// Either `selection_coefficient` against every non-founder state, or an
    /// explicit `table` of per-site log fitness rows.
    Purifying {
        #[serde(default = "default_feature")]
        feature: String,
        #[serde(default)]
        selection_coefficient: Option<f64>,
        #[serde(default)]
        table: Option<Vec<Vec<f64>>>,
    },
    Fluctuating {
        #[serde(default = "default_feature")]
        feature: String,
        selection_coefficient: f64,
        change_probability: f64,
    },
    Signature {
        #[serde(default = "default_feature")]
        feature: String,
        sites: Vec<usize>,
        policy: SignaturePolicy,
    },
    PopulationSize {
        carrying_capacity: f64,
    },
}

fn default_transition_bias() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutatorConfig {
    /// Per-site, per-generation substitution probability.
    pub substitution_rate: f64,
    /// Transition/transversion rate ratio (1 gives Jukes-Cantor).
    #[serde(default = "default_transition_bias")]
    pub transition_bias: f64,
    #[serde(default)]
    pub indel: Option<IndelConfig>,
}

fn default_length_p() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndelConfig {
    pub insertion_rate: f64,
    pub deletion_rate: f64,
    /// Geometric parameter of indel lengths (mean length `1 / length_p`).
    #[serde(default = "default_length_p")]
    pub length_p: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplicatorConfig {
    #[default]
    Clonal,
    Recombinant {
        recombination_probability: f64,
        breakpoint_probability: f64,
        #[serde(default)]
        hotspots: Vec<Hotspot>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub generations: usize,
    #[serde(default)]
    pub mutator: Option<MutatorConfig>,
    #[serde(default)]
    pub replicator: Option<ReplicatorConfig>,
    #[serde(default)]
    pub size_model: Option<PopulationSizeModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Generations between samples; zero samples only the first and last
    /// generation.
    pub interval: usize,
    /// Viruses per alignment sample.
    pub sample_size: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval: 1,
            sample_size: 20,
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter(message.into())
}

impl MutatorConfig {
    pub fn build(&self) -> Result<Box<dyn Mutator>, ConfigError> {
        let substitution = SubstitutionModel::k80(self.substitution_rate, self.transition_bias)?;
        let indel = self
            .indel
            .as_ref()
            .map(|c| IndelModel::new(c.insertion_rate, c.deletion_rate, c.length_p))
            .transpose()?;
        Ok(Box::new(UniformMutator::new(substitution, indel)))
    }
}

impl ReplicatorConfig {
    pub fn build(&self) -> Result<Box<dyn Replicator>, ConfigError> {
        match self {
            Self::Clonal => Ok(Box::new(ClonalReplicator)),
            Self::Recombinant {
                recombination_probability,
                breakpoint_probability,
                hotspots,
            } => {
                let params = RecombinationParams::new(
                    *recombination_probability,
                    *breakpoint_probability,
                    hotspots.clone(),
                )?;
                Ok(Box::new(RecombinantReplicator::new(params)))
            }
        }
    }
}

impl GenomeConfig {
    fn founder(&self, rng: &mut Xoshiro256PlusPlus) -> Result<Sequence, ConfigError> {
        match (&self.sequence, self.random_length) {
            (Some(text), None) => Ok(Sequence::from_str(text)?),
            (None, Some(length)) if length > 0 => Ok(Sequence::random(length, rng)),
            (None, Some(_)) => Err(invalid("genome.random_length must be positive")),
            _ => Err(invalid(
                "genome needs exactly one of `sequence` and `random_length`",
            )),
        }
    }

    fn description(&self, length: usize) -> Result<Arc<GenomeDescription>, ConfigError> {
        let mut features = vec![Feature::spanning(WHOLE_GENOME, length)];
        for config in &self.features {
            let fragments = config
                .fragments
                .iter()
                .map(|&[start, end]| {
                    Fragment::from_bounds(start, end).ok_or_else(|| {
                        CoordinateError::UnorderedFragments {
                            feature: config.name.clone(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            features.push(Feature::new(config.name.as_str(), config.feature_type, fragments)?);
        }
        Ok(GenomeDescription::new(length, features)?)
    }
}

impl FitnessConfig {
    fn build(&self, founder: &Genome) -> Result<Box<dyn FitnessFactor>, ConfigError> {
        let description = founder.description();
        let resolve = |name: &str| {
            description
                .feature_index(name)
                .ok_or_else(|| CoordinateError::UnknownFeature(name.to_string()))
        };
        let alphabet = |index: usize| {
            description
                .feature(index)
                .map_or(0, |f| f.feature_type().alphabet_size())
        };
        let reference = |index: usize| {
            let mut states = Vec::new();
            founder.feature_states(index, &mut states);
            states
        };

        let factor: Box<dyn FitnessFactor> = match self {
            Self::Neutral => Box::new(NeutralFitness),
            Self::Purifying {
                feature,
                selection_coefficient,
                table,
            } => {
                let index = resolve(feature)?;
                let table = match (selection_coefficient, table) {
                    (Some(s), None) => {
                        SiteFitnessTable::from_reference(alphabet(index), &reference(index), *s)?
                    }
                    (None, Some(rows)) => SiteFitnessTable::new(alphabet(index), rows.clone())?,
                    _ => {
                        return Err(invalid(format!(
                            "purifying factor on '{feature}' needs exactly one of \
                             `selection_coefficient` and `table`"
                        )))
                    }
                };
                Box::new(PurifyingFitness::new(format!("purifying:{feature}"), index, table))
            }
            Self::Fluctuating {
                feature,
                selection_coefficient,
                change_probability,
            } => {
                let index = resolve(feature)?;
                let table = SiteFitnessTable::from_reference(
                    alphabet(index),
                    &reference(index),
                    *selection_coefficient,
                )?;
                Box::new(FluctuatingFitness::new(
                    format!("fluctuating:{feature}"),
                    index,
                    table,
                    *change_probability,
                )?)
            }
            Self::Signature {
                feature,
                sites,
                policy,
            } => {
                let index = resolve(feature)?;
                let site_count = description.feature(index).map_or(0, Feature::site_count);
                if let Some(&site) = sites.iter().find(|&&s| s >= site_count) {
                    return Err(FitnessError::InvalidParameter(format!(
                        "signature site {site} outside feature '{feature}' ({site_count} sites)"
                    ))
                    .into());
                }
                Box::new(SignatureFitness::new(
                    format!("signature:{feature}"),
                    index,
                    sites.clone(),
                    *policy,
                )?)
            }
            Self::PopulationSize { carrying_capacity } => {
                Box::new(PopulationSizeFitness::new(*carrying_capacity)?)
            }
        };
        Ok(factor)
    }
}

impl Configuration {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total generations across all epochs.
    pub fn total_generations(&self) -> usize {
        self.epochs.iter().map(|e| e.generations).sum()
    }

    fn size_model(&self) -> PopulationSizeModel {
        self.population
            .size_model
            .unwrap_or(PopulationSizeModel::Static {
                size: self.population.initial_size,
            })
    }

    /// Checks that do not need the founding genome.
    fn check(&self) -> Result<(), ConfigError> {
        if self.population.initial_size == 0 {
            return Err(invalid("population.initial_size must be positive"));
        }
        if self.epochs.is_empty() {
            return Err(invalid("at least one epoch is required"));
        }
        let models = std::iter::once(self.size_model())
            .chain(self.epochs.iter().filter_map(|e| e.size_model));
        for model in models {
            if !model.is_valid() {
                return Err(invalid(format!("invalid population size model {model:?}")));
            }
        }
        Ok(())
    }
}

impl Simulation {
    /// Validate `config` and build a seeded simulation ready to run.
    pub fn from_config(config: &Configuration) -> Result<Self, ConfigError> {
        config.check()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let sequence = config.genome.founder(&mut rng)?;
        let description = config.genome.description(sequence.len())?;
        let storage = config.genome.storage;

        let founder = Genome::new(
            GenomeStorage::from_sequence(StorageKind::Full, &SharedSequence::default(), sequence.clone()),
            Arc::clone(&description),
        );
        let factors = config
            .fitness
            .iter()
            .map(|factor| factor.build(&founder))
            .collect::<Result<Vec<_>, _>>()?;
        let fitness = FitnessFunction::new(factors);

        let mutator = match &config.mutator {
            Some(mutator) => mutator.build()?,
            None => Box::new(NoMutation),
        };
        let replicator = config.replicator.build()?;

        let epochs = config
            .epochs
            .iter()
            .enumerate()
            .map(|(i, e)| -> Result<Epoch, ConfigError> {
                let name = e.name.clone().unwrap_or_else(|| format!("epoch{}", i + 1));
                let mut epoch = Epoch::new(name, e.generations);
                if let Some(m) = &e.mutator {
                    epoch = epoch.with_mutator(m.build()?);
                }
                if let Some(r) = &e.replicator {
                    epoch = epoch.with_replicator(r.build()?);
                }
                if let Some(size_model) = e.size_model {
                    epoch = epoch.with_size_model(size_model);
                }
                Ok(epoch)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pool = GenePool::new(sequence.clone(), description, storage);
        let mut population = Population::new(
            pool,
            fitness,
            Box::new(FitnessProportionalSelector),
            replicator,
            mutator,
            config.size_model(),
        );
        population.seed(sequence, config.population.initial_size)?;

        log::info!(
            "built simulation: seed {seed}, {} bp genome, {} fitness factors, {} epochs",
            population.pool().master().len(),
            population.fitness_function().len(),
            epochs.len()
        );

        let mut simulation = Simulation::from_parts(population, epochs, seed, rng);
        simulation.set_sampling_interval(config.sampling.interval);
        Ok(simulation)
    }
}
