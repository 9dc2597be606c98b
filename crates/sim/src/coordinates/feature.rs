use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Fragment;
use crate::errors::CoordinateError;

/// How a feature's positions are read by fitness factors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Every position is one site with a nucleotide state.
    #[default]
    Nucleotide,
    /// Consecutive position triples are codons; each codon is one site with
    /// an amino-acid state.
    AminoAcid,
}

impl FeatureType {
    /// Size of the state alphabet at each site.
    pub const fn alphabet_size(self) -> usize {
        match self {
            Self::Nucleotide => crate::base::Nucleotide::COUNT,
            Self::AminoAcid => crate::base::AminoAcid::COUNT,
        }
    }
}

/// A named, possibly discontiguous region of the genome.
///
/// Fragments are kept in ascending order and never overlap, so a feature
/// offset maps monotonically onto genome positions. A feature whose
/// fragments were all deleted stays in its description with zero length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    name: Arc<str>,
    feature_type: FeatureType,
    fragments: Vec<Fragment>,
}

impl Feature {
    /// Build a feature, rejecting empty, unordered or overlapping fragments.
    pub fn new(
        name: impl Into<Arc<str>>,
        feature_type: FeatureType,
        fragments: Vec<Fragment>,
    ) -> Result<Self, CoordinateError> {
        let name = name.into();
        if fragments.iter().any(|f| f.length() == 0) {
            return Err(CoordinateError::EmptyFragment {
                feature: name.to_string(),
            });
        }
        if fragments.windows(2).any(|w| w[0].end() > w[1].start()) {
            return Err(CoordinateError::UnorderedFragments {
                feature: name.to_string(),
            });
        }
        Ok(Self {
            name,
            feature_type,
            fragments,
        })
    }

    /// Nucleotide feature with one fragment covering `[0, length)`.
    pub(crate) fn spanning(name: &str, length: usize) -> Self {
        Self {
            name: name.into(),
            feature_type: FeatureType::Nucleotide,
            fragments: vec![Fragment::new(0, length)],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Number of genome positions covered.
    pub fn nucleotide_length(&self) -> usize {
        self.fragments.iter().map(Fragment::length).sum()
    }

    /// Number of sites: positions for nucleotide features, complete codons
    /// for amino-acid features.
    pub fn site_count(&self) -> usize {
        match self.feature_type {
            FeatureType::Nucleotide => self.nucleotide_length(),
            FeatureType::AminoAcid => self.nucleotide_length() / 3,
        }
    }

    /// Largest genome position covered plus one, or zero if empty.
    pub fn end(&self) -> usize {
        self.fragments.last().map_or(0, Fragment::end)
    }

    /// Map a feature offset onto a genome position.
    pub fn genome_position(&self, mut offset: usize) -> Option<usize> {
        for fragment in &self.fragments {
            if offset < fragment.length() {
                return Some(fragment.start() + offset);
            }
            offset -= fragment.length();
        }
        None
    }

    /// Map a genome position onto a feature offset, or `None` if the
    /// position lies outside every fragment.
    pub fn feature_offset(&self, position: usize) -> Option<usize> {
        let idx = self
            .fragments
            .partition_point(|f| f.end() <= position);
        let fragment = self.fragments.get(idx)?;
        if !fragment.contains(position) {
            return None;
        }
        let preceding: usize = self.fragments[..idx].iter().map(Fragment::length).sum();
        Some(preceding + position - fragment.start())
    }

    /// Genome positions covered, in feature order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.fragments.iter().flat_map(|f| f.start()..f.end())
    }

    /// Carry the feature through an indel; see [`super::apply_indel`].
    pub fn apply_indel(&self, position: usize, delta: isize) -> Self {
        Self {
            name: Arc::clone(&self.name),
            feature_type: self.feature_type,
            fragments: self
                .fragments
                .iter()
                .filter_map(|f| f.apply_indel(position, delta))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_part() -> Feature {
        Feature::new(
            "env",
            FeatureType::Nucleotide,
            vec![Fragment::new(4, 5), Fragment::new(10, 4)],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_fragments() {
        assert!(matches!(
            Feature::new("x", FeatureType::Nucleotide, vec![Fragment::new(2, 0)]),
            Err(CoordinateError::EmptyFragment { .. })
        ));
        assert!(matches!(
            Feature::new(
                "x",
                FeatureType::Nucleotide,
                vec![Fragment::new(5, 5), Fragment::new(2, 2)]
            ),
            Err(CoordinateError::UnorderedFragments { .. })
        ));
        assert!(Feature::new(
            "x",
            FeatureType::Nucleotide,
            vec![Fragment::new(2, 3), Fragment::new(4, 3)]
        )
        .is_err());
    }

    #[test]
    fn test_lengths() {
        let f = two_part();
        assert_eq!(f.nucleotide_length(), 9);
        assert_eq!(f.site_count(), 9);
        let aa = Feature::new("gag", FeatureType::AminoAcid, vec![Fragment::new(0, 10)]).unwrap();
        assert_eq!(aa.site_count(), 3);
    }

    #[test]
    fn test_position_mapping_round_trip() {
        let f = two_part();
        for offset in 0..f.nucleotide_length() {
            let pos = f.genome_position(offset).unwrap();
            assert_eq!(f.feature_offset(pos), Some(offset));
        }
        assert_eq!(f.genome_position(5), Some(10));
        assert_eq!(f.genome_position(9), None);
        assert_eq!(f.feature_offset(9), None);
        assert_eq!(f.feature_offset(3), None);
        assert_eq!(f.feature_offset(14), None);
    }

    #[test]
    fn test_positions_iterates_fragments() {
        let f = two_part();
        let positions: Vec<_> = f.positions().collect();
        assert_eq!(positions, vec![4, 5, 6, 7, 8, 10, 11, 12, 13]);
    }

    #[test]
    fn test_apply_indel_drops_empty_fragments() {
        let f = two_part().apply_indel(3, -7);
        assert_eq!(f.fragments(), &[Fragment::new(3, 4)]);
        let gone = f.apply_indel(0, -100);
        assert_eq!(gone.nucleotide_length(), 0);
        assert_eq!(gone.name(), "env");
    }
}
