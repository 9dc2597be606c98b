//! Full and diff genome storage must agree over arbitrary mutation
//! histories, and both must match applying the same edits to a plain
//! sequence.
//!
//! Run with: PROPTEST_CASES=10000 cargo test --release storage_equivalence

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use santa_sim::base::{AminoAcid, Nucleotide, Sequence};
use santa_sim::coordinates::{Feature, FeatureType, Fragment, GenomeDescription};
use santa_sim::evolution::{apply_mutations, Mutation, MutationSet};
use santa_sim::fitness::{FitnessFunction, FluctuatingFitness, PurifyingFitness, SiteFitnessTable};
use santa_sim::genome::{GenePool, GenomeId, StorageKind};

#[derive(Debug, Clone)]
enum Edit {
    Substitute(usize, u8),
    Insert(usize, Vec<u8>),
    Delete(usize, usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        6 => (any::<usize>(), 0u8..4).prop_map(|(p, s)| Edit::Substitute(p, s)),
        1 => (any::<usize>(), prop::collection::vec(0u8..4, 1..6))
            .prop_map(|(p, b)| Edit::Insert(p, b)),
        1 => (any::<usize>(), 1usize..6).prop_map(|(p, c)| Edit::Delete(p, c)),
    ]
}

fn nucleotide(index: u8) -> Nucleotide {
    Nucleotide::from_index(index).unwrap_or(Nucleotide::A)
}

/// Turn raw edits into a valid mutation set for a genome of `len` bases:
/// at most one substitution per site, at most one indel, never emptying
/// the genome.
fn mutation_set(edits: &[Edit], len: usize) -> MutationSet {
    let mut set = MutationSet::new();
    let mut sites = BTreeSet::new();
    let mut has_indel = false;
    for edit in edits {
        match edit {
            Edit::Substitute(p, s) if sites.insert(p % len) => {
                set.insert(Mutation::Substitution {
                    position: p % len,
                    state: nucleotide(*s),
                });
            }
            Edit::Insert(p, bases) if !has_indel => {
                has_indel = true;
                set.insert(Mutation::Insertion {
                    position: p % (len + 1),
                    bases: bases.iter().map(|&b| nucleotide(b)).collect(),
                });
            }
            Edit::Delete(p, c) if !has_indel && len > 1 => {
                has_indel = true;
                let position = p % len;
                let count = (*c).min(len - position).min(len - 1);
                set.insert(Mutation::Deletion { position, count });
            }
            _ => {}
        }
    }
    set
}

fn founder() -> Sequence {
    "ACGTTGCAACGTACGATCGATGCATGCAAGTC".parse().unwrap()
}

fn setup(storage: StorageKind) -> (GenePool, GenomeId, FitnessFunction) {
    let seq = founder();
    let length = seq.len();
    let cds = Feature::new(
        "cds",
        FeatureType::Nucleotide,
        vec![Fragment::new(3, 9), Fragment::new(15, 12)],
    )
    .unwrap();
    let description = GenomeDescription::new(length, vec![cds]).unwrap();
    let reference: Vec<u8> = seq.as_slice()[3..12].iter().map(|n| n.to_index()).collect();
    let fitness = FitnessFunction::new(vec![Box::new(PurifyingFitness::new(
        "p",
        0,
        SiteFitnessTable::from_reference(4, &reference, 0.1).unwrap(),
    ))]);
    let mut pool = GenePool::new(seq.clone(), description.clone(), storage);
    let id = pool.create_genome(seq, description, &fitness);
    (pool, id, fitness)
}

/// Description with a nucleotide feature and a spliced amino-acid feature
/// whose third codon spans the splice junction.
fn spliced_description(length: usize) -> Arc<GenomeDescription> {
    let cds = Feature::new("cds", FeatureType::Nucleotide, vec![Fragment::new(3, 9)]).unwrap();
    let orf = Feature::new(
        "orf",
        FeatureType::AminoAcid,
        vec![Fragment::new(1, 7), Fragment::new(10, 8), Fragment::new(20, 9)],
    )
    .unwrap();
    GenomeDescription::new(length, vec![cds, orf]).unwrap()
}

fn spliced_setup(storage: StorageKind) -> (GenePool, GenomeId, FitnessFunction) {
    let seq = founder();
    let description = spliced_description(seq.len());

    let mut scratch = GenePool::new(seq.clone(), description.clone(), StorageKind::Full);
    let neutral = FitnessFunction::neutral();
    let scratch_id = scratch.create_genome(seq.clone(), description.clone(), &neutral);
    let mut reference = Vec::new();
    scratch.genome(scratch_id).unwrap().feature_states(1, &mut reference);
    assert_eq!(reference.len(), 8);

    let purifying = SiteFitnessTable::from_reference(AminoAcid::COUNT, &reference, 0.3).unwrap();
    let moving = SiteFitnessTable::from_reference(AminoAcid::COUNT, &reference, 0.5).unwrap();
    let fitness = FitnessFunction::new(vec![
        Box::new(PurifyingFitness::new("aa", 1, purifying)),
        Box::new(FluctuatingFitness::new("moving", 1, moving, 0.3).unwrap()),
    ]);
    let mut pool = GenePool::new(seq.clone(), description.clone(), storage);
    let id = pool.create_genome(seq, description, &fitness);
    (pool, id, fitness)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn full_and_diff_storage_agree(
        history in prop::collection::vec(prop::collection::vec(edit(), 0..6), 1..12)
    ) {
        let (mut full, mut full_id, fitness) = setup(StorageKind::Full);
        let (mut diff, mut diff_id, _) = setup(StorageKind::Diff);
        let mut reference = founder();

        for edits in &history {
            let set = mutation_set(edits, reference.len());
            apply_mutations(&mut reference, &set);

            full_id = full.duplicate_genome(full_id, &set, &fitness).unwrap();
            diff_id = diff.duplicate_genome(diff_id, &set, &fitness).unwrap();

            let a = full.genome(full_id).unwrap();
            let b = diff.genome(diff_id).unwrap();
            prop_assert_eq!(a.to_sequence(), reference.clone());
            prop_assert_eq!(b.to_sequence(), reference.clone());
            prop_assert_eq!(a.len(), b.len());
            prop_assert_eq!(a.description().length(), reference.len());
            prop_assert_eq!(a.description(), b.description());
            prop_assert_eq!(a.log_fitness().to_bits(), b.log_fitness().to_bits());
            prop_assert_eq!(a.fitness(), a.log_fitness().exp());
            prop_assert_eq!(a.hamming_distance(b), 0);
        }
    }

    #[test]
    fn incremental_fitness_matches_full_recompute(
        history in prop::collection::vec(prop::collection::vec(edit(), 0..6), 1..12)
    ) {
        let (mut pool, mut id, fitness) = setup(StorageKind::Diff);
        let (mut fresh_pool, _, _) = setup(StorageKind::Full);

        for edits in &history {
            let len = pool.genome(id).unwrap().len();
            let set = mutation_set(edits, len);
            id = pool.duplicate_genome(id, &set, &fitness).unwrap();

            let genome = pool.genome(id).unwrap();
            let fresh_id = fresh_pool.create_genome(
                genome.to_sequence(),
                genome.description().clone(),
                &fitness,
            );
            let fresh = fresh_pool.genome(fresh_id).unwrap().log_fitness();
            prop_assert!((genome.log_fitness() - fresh).abs() < 1e-9,
                "incremental {} vs full {}", genome.log_fitness(), fresh);
        }
    }

    #[test]
    fn amino_acid_fitness_matches_full_recompute(
        seed in any::<u64>(),
        history in prop::collection::vec(prop::collection::vec(edit(), 0..6), 1..12)
    ) {
        for storage in [StorageKind::Full, StorageKind::Diff] {
            let (mut pool, mut id, mut fitness) = spliced_setup(storage);
            let (mut fresh_pool, _, _) = spliced_setup(StorageKind::Full);
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

            for (step, edits) in history.iter().enumerate() {
                if fitness.update_generation(step + 1, &pool, &mut rng) {
                    pool.refresh_fitness(&fitness);
                }
                let len = pool.genome(id).unwrap().len();
                let set = mutation_set(edits, len);
                id = pool.duplicate_genome(id, &set, &fitness).unwrap();

                let genome = pool.genome(id).unwrap();
                let fresh_id = fresh_pool.create_genome(
                    genome.to_sequence(),
                    genome.description().clone(),
                    &fitness,
                );
                let fresh = fresh_pool.genome(fresh_id).unwrap().log_fitness();
                prop_assert!((genome.log_fitness() - fresh).abs() < 1e-9,
                    "{:?} step {}: incremental {} vs full {}",
                    storage, step, genome.log_fitness(), fresh);
            }
        }
    }
}
