//! Mutation events and the models that generate them.
//!
//! A replication event produces a [`MutationSet`]: substitutions plus at
//! most one insertion or deletion, all positioned in the parent's
//! coordinates and kept in ascending order. Consumers that edit storage walk
//! the set in reverse so that applying an event never invalidates the
//! position of one still to come.
//!
//! ## Point Substitutions
//! Drawn from a [`SubstitutionModel`], a symmetric 4x4 rate matrix
//! (JC69 and K80 constructors are provided). Sampling skips over
//! non-mutating sites with a geometric jump when rates are low.
//!
//! ## Insertions and Deletions
//! Drawn from an [`IndelModel`] with independent per-base insertion and
//! deletion rates and geometric event lengths.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rand::{Rng, RngCore};
use rand_distr::{Distribution, Geometric, Poisson};
use serde::{Deserialize, Serialize};

use crate::base::{Nucleotide, Sequence, StateSource};
use crate::coordinates::GenomeDescription;
pub use crate::errors::MutationError;

/// A single mutation event, positioned in parent coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mutation {
    /// Replace the base at `position` with `state`.
    Substitution { position: usize, state: Nucleotide },
    /// Insert `bases` before `position`.
    Insertion { position: usize, bases: Vec<Nucleotide> },
    /// Remove `count` bases starting at `position`.
    Deletion { position: usize, count: usize },
}

/// Mutations of one replication event, ascending by position.
pub type MutationSet = BTreeSet<Mutation>;

impl Mutation {
    #[inline]
    pub fn position(&self) -> usize {
        match self {
            Self::Substitution { position, .. }
            | Self::Insertion { position, .. }
            | Self::Deletion { position, .. } => *position,
        }
    }

    #[inline]
    pub fn is_indel(&self) -> bool {
        !matches!(self, Self::Substitution { .. })
    }

    /// Change in genome length caused by this event.
    pub fn length_delta(&self) -> isize {
        match self {
            Self::Substitution { .. } => 0,
            Self::Insertion { bases, .. } => bases.len() as isize,
            Self::Deletion { count, .. } => -(*count as isize),
        }
    }

    /// Apply to a mutable sequence in place.
    pub fn apply_to(&self, sequence: &mut Sequence) {
        match self {
            Self::Substitution { position, state } => sequence.set(*position, *state),
            Self::Insertion { position, bases } => sequence.insert_slice(*position, bases),
            Self::Deletion { position, count } => sequence.delete_range(*position, *count),
        }
    }

    // Indels sort before substitutions at the same position so that reverse
    // application substitutes the parent base before the indel moves it.
    fn rank(&self) -> u8 {
        match self {
            Self::Insertion { .. } => 0,
            Self::Deletion { .. } => 1,
            Self::Substitution { .. } => 2,
        }
    }
}

impl Ord for Mutation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position()
            .cmp(&other.position())
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| match (self, other) {
                (Self::Substitution { state: a, .. }, Self::Substitution { state: b, .. }) => {
                    a.cmp(b)
                }
                (Self::Insertion { bases: a, .. }, Self::Insertion { bases: b, .. }) => a.cmp(b),
                (Self::Deletion { count: a, .. }, Self::Deletion { count: b, .. }) => a.cmp(b),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for Mutation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substitution { position, state } => write!(f, "{position}{state}"),
            Self::Insertion { position, bases } => {
                write!(f, "ins{position}:")?;
                bases.iter().try_for_each(|b| write!(f, "{b}"))
            }
            Self::Deletion { position, count } => write!(f, "del{position}+{count}"),
        }
    }
}

/// True if any event in the set changes the genome length.
pub fn has_indel(mutations: &MutationSet) -> bool {
    mutations.iter().any(Mutation::is_indel)
}

/// Check that a set describes one replication: at most one substitution per
/// site and at most one indel.
pub fn validate_mutations(mutations: &MutationSet) -> Result<(), MutationError> {
    let mut indels = 0;
    let mut last_substitution = None;
    for mutation in mutations {
        match mutation {
            Mutation::Substitution { position, .. } => {
                if last_substitution == Some(*position) {
                    return Err(MutationError::ConflictingSubstitutions(*position));
                }
                last_substitution = Some(*position);
            }
            _ => indels += 1,
        }
    }
    if indels > 1 {
        return Err(MutationError::MultipleIndels(indels));
    }
    Ok(())
}

/// Apply a whole set to a sequence, walking positions from high to low.
pub fn apply_mutations(sequence: &mut Sequence, mutations: &MutationSet) {
    for mutation in mutations.iter().rev() {
        mutation.apply_to(sequence);
    }
}

/// Coordinate frame after the indels in `mutations`.
///
/// Returns the same `Arc` when the set has no indel.
pub fn derive_description(
    description: &Arc<GenomeDescription>,
    mutations: &MutationSet,
) -> Arc<GenomeDescription> {
    mutations
        .iter()
        .rev()
        .filter(|m| m.is_indel())
        .fold(Arc::clone(description), |frame, m| {
            frame.apply_indel(m.position(), m.length_delta())
        })
}

/// Substitution model for nucleotide mutations.
///
/// A symmetric rate matrix with zero diagonal. Entry `[i][j]` is the
/// per-base, per-replication probability that base `i` becomes `j`; the
/// row sums are the total per-base mutation probabilities.
///
/// Nucleotides are indexed as: A=0, C=1, G=2, T=3
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionModel {
    matrix: [[f64; 4]; 4],
    /// Row sums, cached.
    total_rates: [f64; 4],
}

impl SubstitutionModel {
    /// Create a model from a full rate matrix.
    ///
    /// # Errors
    /// Returns an error if any rate lies outside `[0, 1]`, the diagonal is
    /// non-zero, the matrix is not symmetric or a row sums above 1.
    pub fn new(matrix: [[f64; 4]; 4]) -> Result<Self, MutationError> {
        for (i, row) in matrix.iter().enumerate() {
            if row[i] != 0.0 {
                return Err(MutationError::InvalidMutationRate(row[i]));
            }
            for j in (i + 1)..4 {
                let rate = matrix[i][j];
                if !(0.0..=1.0).contains(&rate) {
                    return Err(MutationError::InvalidMutationRate(rate));
                }
                if (rate - matrix[j][i]).abs() > 1e-12 {
                    return Err(MutationError::AsymmetricMatrix { row: i, column: j });
                }
            }
        }

        let mut total_rates = [0.0; 4];
        for (total, row) in total_rates.iter_mut().zip(matrix.iter()) {
            *total = row.iter().sum();
            if *total > 1.0 {
                return Err(MutationError::InvalidMutationRate(*total));
            }
        }

        Ok(Self {
            matrix,
            total_rates,
        })
    }

    /// Jukes-Cantor: every substitution has rate `mu / 3`.
    pub fn jc69(mu: f64) -> Result<Self, MutationError> {
        Self::k80(mu, 1.0)
    }

    /// Kimura two-parameter model with total per-base rate `mu` and
    /// transition/transversion rate ratio `kappa`.
    pub fn k80(mu: f64, kappa: f64) -> Result<Self, MutationError> {
        if !(0.0..=1.0).contains(&mu) {
            return Err(MutationError::InvalidMutationRate(mu));
        }
        if !kappa.is_finite() || kappa < 0.0 {
            return Err(MutationError::InvalidMutationRate(kappa));
        }
        // One transition and two transversions per base.
        let transversion = mu / (kappa + 2.0);
        let transition = transversion * kappa;

        let mut matrix = [[0.0; 4]; 4];
        for from in Nucleotide::ALL {
            for to in Nucleotide::ALL {
                if from != to {
                    matrix[from.to_index() as usize][to.to_index() as usize] =
                        if from.is_transition_to(to) {
                            transition
                        } else {
                            transversion
                        };
                }
            }
        }
        Self::new(matrix)
    }

    #[inline]
    pub fn total_rate(&self, base: Nucleotide) -> f64 {
        self.total_rates[base.to_index() as usize]
    }

    #[inline]
    pub fn rate(&self, from: Nucleotide, to: Nucleotide) -> f64 {
        self.matrix[from.to_index() as usize][to.to_index() as usize]
    }

    /// Largest per-base mutation probability.
    pub fn max_rate(&self) -> f64 {
        self.total_rates.iter().fold(0.0f64, |a, &b| a.max(b))
    }

    /// Pick the new state for a base already known to mutate.
    #[inline]
    fn target<R: Rng + ?Sized>(&self, base: Nucleotide, rng: &mut R) -> Nucleotide {
        let row = &self.matrix[base.to_index() as usize];
        let r = rng.random::<f64>() * self.total_rate(base);
        let mut cumulative = 0.0;
        let mut fallback = base;
        for to in Nucleotide::ALL {
            let rate = row[to.to_index() as usize];
            if rate <= 0.0 {
                continue;
            }
            cumulative += rate;
            fallback = to;
            if r < cumulative {
                return to;
            }
        }
        fallback
    }

    /// Draw substitutions for every site of `source` into `out`.
    ///
    /// Uses geometric skipping between candidate sites at `max_rate`, then
    /// thins each candidate by its own base's rate. Above a per-base rate of
    /// 0.1 visiting every site is cheaper and is used instead.
    pub fn sample_into<R: Rng + ?Sized>(
        &self,
        source: &dyn StateSource,
        rng: &mut R,
        out: &mut MutationSet,
    ) {
        let len = source.len();
        let max_rate = self.max_rate();
        if len == 0 || max_rate <= 0.0 {
            return;
        }

        if max_rate > 0.1 {
            for position in 0..len {
                let base = source.state(position);
                if rng.random::<f64>() < self.total_rate(base) {
                    out.insert(Mutation::Substitution {
                        position,
                        state: self.target(base, rng),
                    });
                }
            }
            return;
        }

        let log_1_minus_p = (1.0 - max_rate).ln();
        let mut position = 0usize;
        loop {
            // Inverse transform sampling of the geometric gap.
            let u: f64 = rng.random();
            let skip = (u.ln() / log_1_minus_p).floor();
            if !skip.is_finite() || skip >= (len - position) as f64 {
                break;
            }
            position += skip as usize;

            let base = source.state(position);
            if rng.random_bool(self.total_rate(base) / max_rate) {
                out.insert(Mutation::Substitution {
                    position,
                    state: self.target(base, rng),
                });
            }
            position += 1;
            if position >= len {
                break;
            }
        }
    }
}

/// Model for insertion and deletion events.
///
/// Rates are per base per replication; the number of candidate events is
/// Poisson with mean `length * (insertion_rate + deletion_rate)`, but at
/// most one indel is emitted per replication. Event lengths are
/// `1 + Geometric(length_p)`, so the mean length is `1 / length_p`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndelModel {
    insertion_rate: f64,
    deletion_rate: f64,
    length_p: f64,
}

impl IndelModel {
    pub fn new(
        insertion_rate: f64,
        deletion_rate: f64,
        length_p: f64,
    ) -> Result<Self, MutationError> {
        if !(0.0..=1.0).contains(&insertion_rate) {
            return Err(MutationError::InvalidMutationRate(insertion_rate));
        }
        if !(0.0..=1.0).contains(&deletion_rate) {
            return Err(MutationError::InvalidMutationRate(deletion_rate));
        }
        if !(length_p > 0.0 && length_p <= 1.0) {
            return Err(MutationError::InvalidLengthParameter(length_p));
        }

        Ok(Self {
            insertion_rate,
            deletion_rate,
            length_p,
        })
    }

    pub fn insertion_rate(&self) -> f64 {
        self.insertion_rate
    }

    pub fn deletion_rate(&self) -> f64 {
        self.deletion_rate
    }

    fn event_length<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match Geometric::new(self.length_p) {
            Ok(geo) => geo.sample(rng) as usize + 1,
            Err(_) => 1,
        }
    }

    /// Draw at most one indel for a genome of `len` sites.
    ///
    /// Deletions never remove the last remaining base.
    pub fn sample<R: Rng + ?Sized>(&self, len: usize, rng: &mut R) -> Option<Mutation> {
        let total = self.insertion_rate + self.deletion_rate;
        let expected = len as f64 * total;
        if len == 0 || expected <= 0.0 {
            return None;
        }
        let events = match Poisson::new(expected) {
            Ok(p) => p.sample(rng) as usize,
            Err(_) => 0,
        };
        if events == 0 {
            return None;
        }

        let length = self.event_length(rng);
        if rng.random::<f64>() * total < self.insertion_rate {
            let position = rng.random_range(0..=len);
            let bases = (0..length).map(|_| Nucleotide::random(rng)).collect();
            Some(Mutation::Insertion { position, bases })
        } else {
            if len < 2 {
                return None;
            }
            let position = rng.random_range(0..len);
            let count = length.min(len - position).min(len - 1);
            Some(Mutation::Deletion { position, count })
        }
    }
}

/// Produces the mutation set of one replication event.
pub trait Mutator: fmt::Debug {
    /// Read the (possibly recombinant) template and return its mutations in
    /// template coordinates.
    fn mutate(&self, template: &dyn StateSource, rng: &mut dyn RngCore) -> MutationSet;
}

/// Substitutions at uniform per-site rates plus an optional indel model.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformMutator {
    substitution: SubstitutionModel,
    indel: Option<IndelModel>,
}

impl UniformMutator {
    pub fn new(substitution: SubstitutionModel, indel: Option<IndelModel>) -> Self {
        Self {
            substitution,
            indel,
        }
    }

    pub fn substitution_model(&self) -> &SubstitutionModel {
        &self.substitution
    }

    pub fn indel_model(&self) -> Option<&IndelModel> {
        self.indel.as_ref()
    }
}

impl Mutator for UniformMutator {
    fn mutate(&self, template: &dyn StateSource, rng: &mut dyn RngCore) -> MutationSet {
        let mut mutations = MutationSet::new();
        self.substitution.sample_into(template, rng, &mut mutations);
        if let Some(indel) = self.indel.as_ref().and_then(|m| m.sample(template.len(), rng)) {
            mutations.insert(indel);
        }
        mutations
    }
}

/// Mutator that never mutates. Handy for epochs that freeze evolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMutation;

impl Mutator for NoMutation {
    fn mutate(&self, _template: &dyn StateSource, _rng: &mut dyn RngCore) -> MutationSet {
        MutationSet::new()
    }
}
