use std::cell::Cell;
use std::sync::Arc;

use super::storage::{GenomeStorage, StorageKind};
use crate::base::{AminoAcid, Nucleotide, Sequence, StateSource};
use crate::coordinates::{Feature, FeatureType, GenomeDescription};
use crate::errors::FitnessError;
use crate::evolution::{derive_description, has_indel, MutationSet};
use crate::fitness::{FitnessCache, FitnessFunction};

/// State reported for a site that the genome does not have (for example a
/// codon truncated by a deletion).
pub const MISSING_STATE: u8 = u8::MAX;

/// A distinct genotype held in the gene pool.
///
/// Many viruses can carry the same genome; `frequency` counts them. Fitness
/// is cached per factor so a duplicate with a few substitutions only pays for
/// the sites that changed. The exponentiated fitness is computed lazily and
/// cleared whenever the log fitness changes.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    storage: GenomeStorage,
    description: Arc<GenomeDescription>,
    frequency: usize,
    log_fitness: f64,
    fitness: Cell<Option<f64>>,
    mutation_count: usize,
    fitness_cache: FitnessCache,
}

impl Genome {
    pub(crate) fn new(storage: GenomeStorage, description: Arc<GenomeDescription>) -> Self {
        Self {
            storage,
            description,
            ..Self::default()
        }
    }

    /// Number of sites.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Base at `position`. Panics if out of range.
    #[inline]
    pub fn state(&self, position: usize) -> Nucleotide {
        self.storage.get(position)
    }

    pub fn storage(&self) -> &GenomeStorage {
        &self.storage
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    pub fn description(&self) -> &Arc<GenomeDescription> {
        &self.description
    }

    /// Number of viruses carrying this genome.
    #[inline]
    pub fn frequency(&self) -> usize {
        self.frequency
    }

    #[inline]
    pub fn log_fitness(&self) -> f64 {
        self.log_fitness
    }

    /// `exp(log_fitness)`, computed on first use.
    pub fn fitness(&self) -> f64 {
        match self.fitness.get() {
            Some(value) => value,
            None => {
                let value = self.log_fitness.exp();
                self.fitness.set(Some(value));
                value
            }
        }
    }

    /// Mutations accumulated along this genome's lineage.
    pub fn total_mutation_count(&self) -> usize {
        self.mutation_count
    }

    pub fn fitness_cache(&self) -> &FitnessCache {
        &self.fitness_cache
    }

    pub fn to_sequence(&self) -> Sequence {
        self.storage.to_sequence()
    }

    /// States of every site of a feature: nucleotide indices for nucleotide
    /// features, translated amino-acid indices for complete codons of
    /// amino-acid features. Unknown features produce no states.
    pub fn feature_states(&self, feature: usize, out: &mut Vec<u8>) {
        out.clear();
        let Some(feature) = self.description.feature(feature) else {
            return;
        };
        match feature.feature_type() {
            FeatureType::Nucleotide => {
                out.extend(feature.positions().map(|p| self.state(p).to_index()));
            }
            FeatureType::AminoAcid => {
                let mut codon = [Nucleotide::A; 3];
                for (i, position) in feature.positions().enumerate() {
                    codon[i % 3] = self.state(position);
                    if i % 3 == 2 {
                        out.push(AminoAcid::translate(codon).to_index());
                    }
                }
            }
        }
    }

    /// State of one site of a feature, or `None` if the site lies past the
    /// feature's end in this genome.
    pub fn site_state(&self, feature: usize, site: usize) -> Option<u8> {
        let feature = self.description.feature(feature)?;
        match feature.feature_type() {
            FeatureType::Nucleotide => feature
                .genome_position(site)
                .map(|p| self.state(p).to_index()),
            FeatureType::AminoAcid => self
                .codon(feature, site)
                .map(|codon| AminoAcid::translate(codon).to_index()),
        }
    }

    /// States of the listed sites, with [`MISSING_STATE`] for absent ones.
    pub fn site_states(&self, feature: usize, sites: &[usize], out: &mut Vec<u8>) {
        out.clear();
        out.extend(
            sites
                .iter()
                .map(|&site| self.site_state(feature, site).unwrap_or(MISSING_STATE)),
        );
    }

    pub(crate) fn codon(&self, feature: &Feature, codon: usize) -> Option<[Nucleotide; 3]> {
        let first = codon.checked_mul(3)?;
        let mut bases = [Nucleotide::A; 3];
        for (k, base) in bases.iter_mut().enumerate() {
            *base = self.state(feature.genome_position(first + k)?);
        }
        Some(bases)
    }

    /// Differing sites over the common prefix plus the length difference.
    pub fn hamming_distance(&self, other: &Genome) -> usize {
        match (&self.storage, &other.storage) {
            (GenomeStorage::Full(a), GenomeStorage::Full(b)) => a.hamming_distance(b),
            (GenomeStorage::Diff(a), GenomeStorage::Diff(b)) => a
                .substitution_distance(b)
                .unwrap_or_else(|| self.positional_distance(other)),
            _ => self.positional_distance(other),
        }
    }

    fn positional_distance(&self, other: &Genome) -> usize {
        let common = self.len().min(other.len());
        let mismatches = (0..common)
            .filter(|&i| self.state(i) != other.state(i))
            .count();
        mismatches + self.len().abs_diff(other.len())
    }

    /// Overwrite with `other`, reusing this genome's buffers.
    pub(crate) fn copy_from(&mut self, other: &Genome) {
        self.storage.copy_from(&other.storage);
        self.description = Arc::clone(&other.description);
        self.frequency = other.frequency;
        self.log_fitness = other.log_fitness;
        self.fitness.set(other.fitness.get());
        self.mutation_count = other.mutation_count;
        self.fitness_cache.clone_from(&other.fitness_cache);
    }

    pub(crate) fn reset(&mut self, storage: GenomeStorage, description: Arc<GenomeDescription>) {
        self.storage = storage;
        self.description = description;
        self.frequency = 0;
        self.mutation_count = 0;
        self.set_log_fitness(0.0);
    }

    pub(crate) fn set_frequency(&mut self, frequency: usize) {
        self.frequency = frequency;
    }

    pub(crate) fn add_mutations(&mut self, count: usize) {
        self.mutation_count += count;
    }

    pub(crate) fn set_log_fitness(&mut self, log_fitness: f64) {
        self.log_fitness = log_fitness;
        self.fitness.set(None);
    }

    pub(crate) fn fitness_cache_mut(&mut self) -> &mut FitnessCache {
        &mut self.fitness_cache
    }

    /// Make the log fitness equal the sum of the cached contributions.
    pub(crate) fn sync_log_fitness(&mut self) {
        let total = self.fitness_cache.total();
        self.set_log_fitness(total);
    }

    /// Apply a mutation set and bring fitness up to date.
    ///
    /// Without indels, incremental factors are updated from the state
    /// changes before the storage is touched and the rest are recomputed
    /// afterwards. Any indel shifts feature coordinates, so every factor is
    /// recomputed in full.
    pub(crate) fn apply_mutations(
        &mut self,
        mutations: &MutationSet,
        fitness: &FitnessFunction,
    ) -> Result<(), FitnessError> {
        if has_indel(mutations) {
            self.apply_to_storage(mutations);
            fitness.compute_full(self);
            return Ok(());
        }

        let stale = fitness.apply_deltas(self, mutations)?;
        self.apply_to_storage(mutations);
        for factor in stale {
            fitness.recompute_factor(self, factor);
        }
        self.sync_log_fitness();
        Ok(())
    }

    fn apply_to_storage(&mut self, mutations: &MutationSet) {
        self.description = derive_description(&self.description, mutations);
        for mutation in mutations.iter().rev() {
            self.storage.apply(mutation);
        }
    }
}

impl StateSource for Genome {
    #[inline]
    fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    fn state(&self, position: usize) -> Nucleotide {
        self.storage.get(position)
    }
}
