use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;

use rand::Rng;

use super::Nucleotide;
use crate::errors::InvalidSequence;

/// Read-only positional access to a nucleotide sequence.
///
/// Implemented by plain sequences and by genomes regardless of how the
/// genome stores its bases, so mutators and recombination can read states
/// without caring about the storage strategy.
pub trait StateSource {
    /// Number of sites.
    fn len(&self) -> usize;

    /// State at `position`. Panics if `position >= len()`.
    fn state(&self, position: usize) -> Nucleotide;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable sequence backed by a vector of `Nucleotide`s.
///
/// `Sequence` is used wherever bases are edited in place: full genome
/// storage, recombinant assembly and replaying indels. For the read-only
/// master copy shared by diff genomes, convert with `into_shared`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sequence(Vec<Nucleotide>);

impl Sequence {
    /// Create a new, empty `Sequence`.
    ///
    /// ```rust
    /// # use santa_sim::base::Sequence;
    /// let seq = Sequence::new();
    /// assert_eq!(seq.len(), 0);
    /// ```
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn from_nucleotides(nucleotides: Vec<Nucleotide>) -> Self {
        Self(nucleotides)
    }

    /// Draw a uniformly random sequence of `length` bases.
    pub fn random<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Self {
        Self((0..length).map(|_| Nucleotide::random(rng)).collect())
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the `Nucleotide` at `index`, or `None` if out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Nucleotide> {
        self.0.get(index).copied()
    }

    /// Overwrite the base at `index`. Panics when out of range, like slice
    /// indexing; callers validate positions against the genome length first.
    #[inline]
    pub fn set(&mut self, index: usize, base: Nucleotide) {
        self.0[index] = base;
    }

    #[inline]
    pub fn as_slice(&self) -> &[Nucleotide] {
        &self.0
    }

    #[inline]
    pub fn push(&mut self, base: Nucleotide) {
        self.0.push(base);
    }

    /// Append the bases in `range` of `source`.
    pub fn extend_from_source(&mut self, source: &dyn StateSource, range: Range<usize>) {
        self.0.extend(range.map(|i| source.state(i)));
    }

    /// Insert `bases` before `position`, shifting the tail right.
    pub fn insert_slice(&mut self, position: usize, bases: &[Nucleotide]) {
        self.0.splice(position..position, bases.iter().copied());
    }

    /// Remove up to `count` bases starting at `position`.
    pub fn delete_range(&mut self, position: usize, count: usize) {
        let end = position.saturating_add(count).min(self.0.len());
        self.0.drain(position.min(end)..end);
    }

    /// Clear the contents while keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Consume this `Sequence` and produce an immutable `SharedSequence`.
    pub fn into_shared(self) -> SharedSequence {
        SharedSequence(self.0.into())
    }

    /// Number of mismatching sites over the common prefix plus the length
    /// difference.
    pub fn hamming_distance(&self, other: &Sequence) -> usize {
        let mismatches = self
            .0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a != b)
            .count();
        mismatches + self.len().abs_diff(other.len())
    }
}

impl StateSource for Sequence {
    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn state(&self, position: usize) -> Nucleotide {
        self.0[position]
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &nuc in &self.0 {
            write!(f, "{}", nuc.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for Sequence {
    type Err = InvalidSequence;

    /// Parse text such as `"ACGT"`, ignoring ASCII whitespace so wrapped
    /// FASTA-style input can be pasted into configurations.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = s
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .map(|c| {
                u8::try_from(c)
                    .ok()
                    .and_then(Nucleotide::from_ascii)
                    .ok_or(InvalidSequence::InvalidChar(c))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if data.is_empty() {
            return Err(InvalidSequence::EmptySequence);
        }
        Ok(Self(data))
    }
}

impl From<Vec<Nucleotide>> for Sequence {
    fn from(value: Vec<Nucleotide>) -> Self {
        Self(value)
    }
}

/// Immutable, shareable sequence.
///
/// Holds its data in an `Arc<[Nucleotide]>`; cloning is a reference-count
/// bump. Diff genomes all point at one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SharedSequence(Arc<[Nucleotide]>);

impl SharedSequence {
    pub fn new(data: Arc<[Nucleotide]>) -> Self {
        Self(data)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Nucleotide> {
        self.0.get(index).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Nucleotide] {
        &self.0
    }

    /// True if both handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Copy into a fresh mutable `Sequence`.
    pub fn to_mutable(&self) -> Sequence {
        Sequence(self.0.to_vec())
    }
}

impl Default for SharedSequence {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl StateSource for SharedSequence {
    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn state(&self, position: usize) -> Nucleotide {
        self.0[position]
    }
}

impl fmt::Display for SharedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &nuc in self.0.iter() {
            write!(f, "{}", nuc.to_char())?;
        }
        Ok(())
    }
}
