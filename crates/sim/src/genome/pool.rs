use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::record::Genome;
use super::storage::{GenomeStorage, StorageKind};
use crate::base::{Arena, Handle, Nucleotide, Sequence, SharedSequence};
use crate::coordinates::GenomeDescription;
use crate::errors::GenePoolError;
use crate::evolution::{validate_mutations, MutationSet};
use crate::fitness::FitnessFunction;

/// Stable identifier of a genome in a [`GenePool`].
///
/// Carries the slot's generation, so an id kept after its genome was
/// released is detected instead of silently reading the slot's next
/// occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenomeId(Handle);

impl GenomeId {
    pub fn index(&self) -> u32 {
        self.0.index
    }

    pub fn generation(&self) -> u32 {
        self.0.generation
    }
}

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.0.index, self.0.generation)
    }
}

/// Per-site nucleotide counts across the population, weighted by genome
/// frequency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateFrequencies {
    counts: Vec<[usize; 4]>,
    population: usize,
}

impl StateFrequencies {
    /// Number of sites: the length of the longest live genome.
    pub fn site_count(&self) -> usize {
        self.counts.len()
    }

    pub fn population(&self) -> usize {
        self.population
    }

    pub fn counts(&self, site: usize) -> [usize; 4] {
        self.counts.get(site).copied().unwrap_or([0; 4])
    }

    /// Fraction of the population carrying `state` at `site`.
    pub fn frequency(&self, site: usize, state: Nucleotide) -> f64 {
        if self.population == 0 {
            return 0.0;
        }
        self.counts(site)[state.to_index() as usize] as f64 / self.population as f64
    }

    /// Most common state at every site, ties going to the lowest index.
    pub fn consensus(&self) -> Sequence {
        self.counts
            .iter()
            .map(|counts| {
                let mut best = 0;
                for state in 1..4 {
                    if counts[state] > counts[best] {
                        best = state;
                    }
                }
                Nucleotide::ALL[best]
            })
            .collect::<Vec<_>>()
            .into()
    }
}

/// All distinct genomes alive in the simulation.
///
/// Genomes live in a generational arena. A genome is released as soon as
/// its frequency drops to zero and its slot, with its buffers, is recycled
/// by the next genome created. Statistics over the pool are cached until
/// the next change.
#[derive(Debug)]
pub struct GenePool {
    genomes: Arena<Genome>,
    storage: StorageKind,
    master: SharedSequence,
    root: Arc<GenomeDescription>,
    population_size: usize,
    state_frequencies: OnceCell<StateFrequencies>,
}

impl GenePool {
    /// Empty pool whose diff genomes (if any) are encoded against `master`.
    pub fn new(master: Sequence, root: Arc<GenomeDescription>, storage: StorageKind) -> Self {
        Self {
            genomes: Arena::new(),
            storage,
            master: master.into_shared(),
            root,
            population_size: 0,
            state_frequencies: OnceCell::new(),
        }
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.storage
    }

    pub fn master(&self) -> &SharedSequence {
        &self.master
    }

    /// Coordinate frame of genomes that have seen no indel.
    pub fn root_description(&self) -> &Arc<GenomeDescription> {
        &self.root
    }

    /// Sum of all genome frequencies.
    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Number of distinct live genomes.
    pub fn unique_genome_count(&self) -> usize {
        self.genomes.live_len()
    }

    /// Released slots waiting to be reused.
    pub fn unused_genome_count(&self) -> usize {
        self.genomes.free_len()
    }

    pub fn genome(&self, id: GenomeId) -> Result<&Genome, GenePoolError> {
        self.genomes.get(id.0).ok_or(GenePoolError::StaleGenome {
            index: id.index(),
            generation: id.generation(),
        })
    }

    pub fn live_genomes(&self) -> impl Iterator<Item = (GenomeId, &Genome)> + '_ {
        self.genomes.iter_live().map(|(h, g)| (GenomeId(h), g))
    }

    fn invalidate(&mut self) {
        self.state_frequencies.take();
    }

    /// Add a genome holding `sequence` in frame `description`, with
    /// frequency one and freshly computed fitness.
    pub fn create_genome(
        &mut self,
        sequence: Sequence,
        description: Arc<GenomeDescription>,
        fitness: &FitnessFunction,
    ) -> GenomeId {
        self.create_recombinant(sequence, description, 0, fitness)
    }

    /// Like [`create_genome`](Self::create_genome), recording
    /// `inherited_mutations` as the lineage mutation count.
    pub fn create_recombinant(
        &mut self,
        sequence: Sequence,
        description: Arc<GenomeDescription>,
        inherited_mutations: usize,
        fitness: &FitnessFunction,
    ) -> GenomeId {
        debug_assert_eq!(sequence.len(), description.length());
        let storage = GenomeStorage::from_sequence(self.storage, &self.master, sequence);
        let index = self.genomes.reserve();
        let genome = self.genomes.dormant_mut(index);
        genome.reset(storage, description);
        genome.add_mutations(inherited_mutations);
        fitness.compute_full(genome);
        genome.set_frequency(1);

        self.population_size += 1;
        self.invalidate();
        GenomeId(self.genomes.activate(index))
    }

    /// Record one more copy of `parent`, mutated by `mutations`.
    ///
    /// With no mutations this only bumps the parent's frequency and returns
    /// the parent's id. Otherwise the parent is copied into a recycled slot,
    /// the mutations are applied and fitness is brought up to date.
    pub fn duplicate_genome(
        &mut self,
        parent: GenomeId,
        mutations: &MutationSet,
        fitness: &FitnessFunction,
    ) -> Result<GenomeId, GenePoolError> {
        let stale = GenePoolError::StaleGenome {
            index: parent.index(),
            generation: parent.generation(),
        };
        validate_mutations(mutations)?;

        if mutations.is_empty() {
            let genome = self.genomes.get_mut(parent.0).ok_or(stale)?;
            genome.set_frequency(genome.frequency() + 1);
            self.population_size += 1;
            self.invalidate();
            return Ok(parent);
        }

        let index = self.genomes.reserve();
        let Some((source, child)) = self.genomes.live_and_dormant(parent.0, index) else {
            self.genomes.abandon(index);
            return Err(stale);
        };
        child.copy_from(source);
        if let Err(err) = child.apply_mutations(mutations, fitness) {
            self.genomes.abandon(index);
            return Err(err.into());
        }
        child.set_frequency(1);
        child.add_mutations(mutations.len());

        self.population_size += 1;
        self.invalidate();
        Ok(GenomeId(self.genomes.activate(index)))
    }

    /// Remove one copy of `id`, releasing the genome when none remain.
    ///
    /// Killing a genome that was already released fails with
    /// [`GenePoolError::DoubleRelease`].
    pub fn kill_genome(&mut self, id: GenomeId) -> Result<(), GenePoolError> {
        let genome = self
            .genomes
            .get_mut(id.0)
            .ok_or(GenePoolError::DoubleRelease { index: id.index() })?;
        let remaining = genome.frequency() - 1;
        genome.set_frequency(remaining);
        if remaining == 0 {
            self.genomes.release(id.0);
        }
        self.population_size -= 1;
        self.invalidate();
        Ok(())
    }

    /// Recompute the factors flagged by the last
    /// [`FitnessFunction::update_generation`] for every live genome.
    pub fn refresh_fitness(&mut self, fitness: &FitnessFunction) {
        for genome in self.genomes.values_live_mut() {
            fitness.refresh_flagged(genome);
        }
    }

    /// Frequency-weighted per-site state counts, computed on first use
    /// after any change to the pool.
    pub fn state_frequencies(&self) -> &StateFrequencies {
        self.state_frequencies.get_or_init(|| {
            let sites = self
                .genomes
                .iter_live()
                .map(|(_, g)| g.len())
                .max()
                .unwrap_or(0);
            let mut counts = vec![[0usize; 4]; sites];
            for (_, genome) in self.genomes.iter_live() {
                let copies = genome.frequency();
                for (site, count) in counts.iter_mut().enumerate().take(genome.len()) {
                    count[genome.state(site).to_index() as usize] += copies;
                }
            }
            StateFrequencies {
                counts,
                population: self.population_size,
            }
        })
    }

    /// Majority state at each site across the population.
    pub fn consensus_sequence(&self) -> Sequence {
        self.state_frequencies().consensus()
    }

    pub fn hamming_distance(&self, a: GenomeId, b: GenomeId) -> Result<usize, GenePoolError> {
        Ok(self.genome(a)?.hamming_distance(self.genome(b)?))
    }
}
