use std::sync::Arc;

use super::Feature;
use crate::errors::CoordinateError;

/// Coordinate frame of a genome: its length and the features laid over it.
///
/// Descriptions are immutable and shared through `Arc`. Genomes without
/// indels all point at the same root description; an indel derives a new
/// description with the features moved through it and the version bumped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenomeDescription {
    version: u64,
    length: usize,
    features: Vec<Feature>,
}

/// Name of the implicit feature spanning a whole genome.
pub const WHOLE_GENOME: &str = "genome";

impl GenomeDescription {
    /// Build a root description, validating that every feature fits inside
    /// `length` and names are unique.
    pub fn new(length: usize, features: Vec<Feature>) -> Result<Arc<Self>, CoordinateError> {
        for (i, feature) in features.iter().enumerate() {
            if feature.end() > length {
                return Err(CoordinateError::OutOfRange {
                    feature: feature.name().to_string(),
                    end: feature.end(),
                    length,
                });
            }
            if features[..i].iter().any(|f| f.name() == feature.name()) {
                return Err(CoordinateError::DuplicateFeature(feature.name().to_string()));
            }
        }
        Ok(Arc::new(Self {
            version: 0,
            length,
            features,
        }))
    }

    /// Description with a single nucleotide feature covering the genome.
    pub fn whole_genome(length: usize) -> Arc<Self> {
        let features = if length > 0 {
            vec![Feature::spanning(WHOLE_GENOME, length)]
        } else {
            Vec::new()
        };
        Arc::new(Self {
            version: 0,
            length,
            features,
        })
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    #[inline]
    pub fn feature(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name() == name)
    }

    /// True when both descriptions lay out the same features over the same
    /// length, regardless of the path that led to them.
    pub fn same_frame(&self, other: &Self) -> bool {
        self.length == other.length && self.features == other.features
    }

    /// Derive the frame that results from an indel at `position`.
    ///
    /// A zero `delta` returns the same `Arc`.
    pub fn apply_indel(self: &Arc<Self>, position: usize, delta: isize) -> Arc<Self> {
        if delta == 0 {
            return Arc::clone(self);
        }
        let length = self.length.saturating_add_signed(delta);
        Arc::new(Self {
            version: self.version + 1,
            length,
            features: self
                .features
                .iter()
                .map(|f| f.apply_indel(position, delta))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::{FeatureType, Fragment};

    fn scenario() -> Arc<GenomeDescription> {
        let a = Feature::new("a", FeatureType::Nucleotide, vec![Fragment::new(4, 5)]).unwrap();
        let b = Feature::new("b", FeatureType::Nucleotide, vec![Fragment::new(10, 4)]).unwrap();
        GenomeDescription::new(24, vec![a, b]).unwrap()
    }

    #[test]
    fn test_deletion_moves_all_features() {
        let root = scenario();
        let derived = root.apply_indel(2, -4);
        assert_eq!(derived.length(), 20);
        assert_eq!(derived.version(), 1);
        assert_eq!(derived.feature(0).unwrap().fragments(), &[Fragment::new(2, 3)]);
        assert_eq!(derived.feature(1).unwrap().fragments(), &[Fragment::new(6, 4)]);
        // The root frame is untouched.
        assert_eq!(root.length(), 24);
        assert_eq!(root.feature(0).unwrap().fragments(), &[Fragment::new(4, 5)]);
    }

    #[test]
    fn test_zero_delta_shares_frame() {
        let root = scenario();
        assert!(Arc::ptr_eq(&root, &root.apply_indel(5, 0)));
    }

    #[test]
    fn test_same_frame_ignores_version() {
        let root = scenario();
        let round_trip = root.apply_indel(20, 2).apply_indel(20, -2);
        assert_eq!(round_trip.version(), 2);
        assert!(root.same_frame(&round_trip));
        assert!(!root.same_frame(&root.apply_indel(0, 1)));
    }

    #[test]
    fn test_validation() {
        let long = Feature::new("x", FeatureType::Nucleotide, vec![Fragment::new(20, 10)]).unwrap();
        assert!(matches!(
            GenomeDescription::new(24, vec![long]),
            Err(CoordinateError::OutOfRange { end: 30, .. })
        ));
        let a = Feature::new("a", FeatureType::Nucleotide, vec![Fragment::new(0, 2)]).unwrap();
        assert!(matches!(
            GenomeDescription::new(24, vec![a.clone(), a]),
            Err(CoordinateError::DuplicateFeature(_))
        ));
    }

    #[test]
    fn test_whole_genome() {
        let d = GenomeDescription::whole_genome(30);
        assert_eq!(d.feature_index(WHOLE_GENOME), Some(0));
        assert_eq!(d.feature(0).unwrap().nucleotide_length(), 30);
    }
}
