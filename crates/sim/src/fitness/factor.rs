use std::fmt;

use rand::RngCore;

use crate::base::{AminoAcid, Nucleotide};
use crate::coordinates::FeatureType;
use crate::errors::FitnessError;
use crate::evolution::Mutation;
use crate::genome::{GenePool, Genome};

/// One site of a feature changing state during replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// Site index within the feature.
    pub site: usize,
    pub old_state: u8,
    pub new_state: u8,
}

/// A multiplicative component of fitness, evaluated in log space.
///
/// A factor reads one feature of the genome (or none at all, for factors
/// that depend only on the population). `compute_log_fitness` receives the
/// feature's states as produced by [`Genome::feature_states`].
pub trait FitnessFactor: fmt::Debug {
    fn name(&self) -> &str;

    /// Feature index the factor reads, or `None` if it ignores genome
    /// content.
    fn feature(&self) -> Option<usize>;

    /// Log fitness contribution of a genome with the given feature states.
    fn compute_log_fitness(&self, states: &[u8]) -> f64;

    /// Contribution change caused by a single site change.
    ///
    /// Only meaningful when [`is_incremental`](Self::is_incremental) holds.
    fn log_fitness_change(&self, change: &StateChange) -> f64;

    /// Whether contributions are a sum over sites, so that
    /// `log_fitness_change` deltas can be added to a cached value.
    fn is_incremental(&self) -> bool {
        true
    }

    /// Called once at the start of every generation, before selection.
    ///
    /// Returns `true` if the contribution of existing genomes may have
    /// changed, in which case every live genome is recomputed for this
    /// factor.
    fn update_generation(
        &mut self,
        generation: usize,
        pool: &GenePool,
        rng: &mut dyn RngCore,
    ) -> bool;
}

/// Collect the state changes `mutations` would cause in one feature of
/// `genome`, which must still hold the pre-mutation states.
///
/// Substitutions outside the feature are ignored, as are substitutions that
/// leave the state unchanged. For amino-acid features substitutions are
/// grouped by codon and synonymous codon changes are dropped; the grouping
/// relies on ascending order and fails with
/// [`FitnessError::CodonMismatch`] if a codon is revisited after a later one.
pub fn state_changes<'a>(
    genome: &Genome,
    feature_index: usize,
    mutations: impl IntoIterator<Item = &'a Mutation>,
    out: &mut Vec<StateChange>,
) -> Result<(), FitnessError> {
    let Some(feature) = genome.description().feature(feature_index) else {
        return Ok(());
    };

    let substitutions = mutations.into_iter().filter_map(|m| match m {
        Mutation::Substitution { position, state } => Some((*position, *state)),
        _ => None,
    });

    match feature.feature_type() {
        FeatureType::Nucleotide => {
            for (position, state) in substitutions {
                let Some(site) = feature.feature_offset(position) else {
                    continue;
                };
                let old = genome.state(position);
                if old != state {
                    out.push(StateChange {
                        site,
                        old_state: old.to_index(),
                        new_state: state.to_index(),
                    });
                }
            }
        }
        FeatureType::AminoAcid => {
            let codons = feature.site_count();
            let mut open: Option<CodonEdit> = None;
            for (position, state) in substitutions {
                let Some(offset) = feature.feature_offset(position) else {
                    continue;
                };
                let codon = offset / 3;
                if codon >= codons {
                    continue;
                }
                match open.as_ref().map(|edit: &CodonEdit| edit.0) {
                    Some(current) if current == codon => {
                        if let Some((_, _, after)) = open.as_mut() {
                            after[offset % 3] = state;
                        }
                    }
                    Some(current) if current > codon => {
                        return Err(FitnessError::CodonMismatch {
                            feature: feature_index,
                            codon,
                            previous: current,
                        });
                    }
                    _ => {
                        close_codon(open.take(), out);
                        if let Some(before) = genome.codon(feature, codon) {
                            let mut after = before;
                            after[offset % 3] = state;
                            open = Some((codon, before, after));
                        }
                    }
                }
            }
            close_codon(open, out);
        }
    }
    Ok(())
}

/// Codon index with its bases before and after the substitutions seen so far.
type CodonEdit = (usize, [Nucleotide; 3], [Nucleotide; 3]);

fn close_codon(codon: Option<CodonEdit>, out: &mut Vec<StateChange>) {
    if let Some((site, before, after)) = codon {
        let old = AminoAcid::translate(before);
        let new = AminoAcid::translate(after);
        if old != new {
            out.push(StateChange {
                site,
                old_state: old.to_index(),
                new_state: new.to_index(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Sequence;
    use crate::coordinates::{Feature, Fragment, GenomeDescription};
    use crate::evolution::MutationSet;
    use crate::genome::{GenomeStorage, StorageKind};
    use std::str::FromStr;
    use Nucleotide::*;

    fn genome(seq: &str, feature_type: FeatureType, fragment: Fragment) -> Genome {
        let seq = Sequence::from_str(seq).unwrap();
        let feature = Feature::new("f", feature_type, vec![fragment]).unwrap();
        let description = GenomeDescription::new(seq.len(), vec![feature]).unwrap();
        let master = seq.clone().into_shared();
        Genome::new(
            GenomeStorage::from_sequence(StorageKind::Full, &master, seq),
            description,
        )
    }

    fn sub(position: usize, state: Nucleotide) -> Mutation {
        Mutation::Substitution { position, state }
    }

    #[test]
    fn test_nucleotide_changes_use_feature_offsets() {
        let g = genome("AAAAAAAA", FeatureType::Nucleotide, Fragment::new(2, 4));
        let set: MutationSet = [sub(0, C), sub(3, G), sub(4, A), sub(5, T)]
            .into_iter()
            .collect();
        let mut out = Vec::new();
        state_changes(&g, 0, &set, &mut out).unwrap();
        assert_eq!(
            out,
            vec![
                StateChange {
                    site: 1,
                    old_state: 0,
                    new_state: 2
                },
                StateChange {
                    site: 3,
                    old_state: 0,
                    new_state: 3
                },
            ]
        );
    }

    #[test]
    fn test_synonymous_codon_change_suppressed() {
        // GCT (Ala) -> GCC (Ala) is synonymous, CTT (Leu) -> CCT (Pro) is not.
        let g = genome("GCTCTT", FeatureType::AminoAcid, Fragment::new(0, 6));
        let set: MutationSet = [sub(2, C), sub(4, C)].into_iter().collect();
        let mut out = Vec::new();
        state_changes(&g, 0, &set, &mut out).unwrap();
        assert_eq!(
            out,
            vec![StateChange {
                site: 1,
                old_state: AminoAcid::Leu.to_index(),
                new_state: AminoAcid::Pro.to_index(),
            }]
        );
    }

    #[test]
    fn test_multiple_substitutions_in_one_codon() {
        // ATG (Met) -> TTA (Leu) via two substitutions
        let g = genome("ATGAAA", FeatureType::AminoAcid, Fragment::new(0, 6));
        let set: MutationSet = [sub(0, T), sub(2, A)].into_iter().collect();
        let mut out = Vec::new();
        state_changes(&g, 0, &set, &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].old_state, AminoAcid::Met.to_index());
        assert_eq!(out[0].new_state, AminoAcid::Leu.to_index());
    }

    #[test]
    fn test_descending_order_is_rejected() {
        let g = genome("ATGAAAGGG", FeatureType::AminoAcid, Fragment::new(0, 9));
        let descending = [sub(7, C), sub(1, C)];
        let mut out = Vec::new();
        let err = state_changes(&g, 0, descending.iter(), &mut out).unwrap_err();
        assert_eq!(
            err,
            FitnessError::CodonMismatch {
                feature: 0,
                codon: 0,
                previous: 2
            }
        );
    }

    #[test]
    fn test_unknown_feature_yields_nothing() {
        let g = genome("ACGT", FeatureType::Nucleotide, Fragment::new(0, 4));
        let set: MutationSet = [sub(0, C)].into_iter().collect();
        let mut out = Vec::new();
        state_changes(&g, 3, &set, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
