use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::base::{Nucleotide, Sequence, SharedSequence, StateSource};
use crate::evolution::Mutation;

/// Which storage strategy a gene pool uses for all of its genomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Every genome owns a complete copy of its sequence.
    #[default]
    Full,
    /// Genomes store only their differences from a shared master sequence.
    Diff,
}

/// Base storage of one genome.
#[derive(Debug, Clone)]
pub enum GenomeStorage {
    Full(Sequence),
    Diff(DiffSequence),
}

impl Default for GenomeStorage {
    fn default() -> Self {
        Self::Full(Sequence::new())
    }
}

impl GenomeStorage {
    /// Build storage of the given kind holding `sequence`.
    pub fn from_sequence(kind: StorageKind, master: &SharedSequence, sequence: Sequence) -> Self {
        match kind {
            StorageKind::Full => Self::Full(sequence),
            StorageKind::Diff => Self::Diff(DiffSequence::from_sequence(master.clone(), &sequence)),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            Self::Full(_) => StorageKind::Full,
            Self::Diff(_) => StorageKind::Diff,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Full(seq) => seq.len(),
            Self::Diff(diff) => diff.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, position: usize) -> Nucleotide {
        match self {
            Self::Full(seq) => seq.as_slice()[position],
            Self::Diff(diff) => diff.get(position),
        }
    }

    /// Apply one mutation in current coordinates.
    pub fn apply(&mut self, mutation: &Mutation) {
        match self {
            Self::Full(seq) => mutation.apply_to(seq),
            Self::Diff(diff) => diff.apply(mutation),
        }
    }

    /// Materialize the full sequence.
    pub fn to_sequence(&self) -> Sequence {
        match self {
            Self::Full(seq) => seq.clone(),
            Self::Diff(diff) => diff.to_sequence(),
        }
    }

    /// Overwrite `self` with `other`, reusing buffers where the variants
    /// match.
    pub fn copy_from(&mut self, other: &Self) {
        match (self, other) {
            (Self::Full(dst), Self::Full(src)) => dst.clone_from(src),
            (Self::Diff(dst), Self::Diff(src)) => dst.clone_from(src),
            (dst, src) => *dst = src.clone(),
        }
    }
}

/// Indel records kept before the log is folded into a single rebase.
const INDEL_LOG_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
enum IndelRecord {
    Insertion { position: usize, bases: Arc<[Nucleotide]> },
    Deletion { position: usize, count: usize },
}

/// A sequence stored as edits against a shared master.
///
/// Substitutions are keyed by position in the genome's current coordinates.
/// Indels are logged in the order they happened; resolving a position that
/// has no substitution walks the log backwards to find where that base came
/// from. A substitution back to the underlying base removes the entry, so
/// the map only ever holds real differences. Once the log grows past
/// [`INDEL_LOG_LIMIT`] records it is rebased into one deletion of the whole
/// master and one insertion of the indel-adjusted bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSequence {
    master: SharedSequence,
    substitutions: BTreeMap<usize, Nucleotide>,
    indels: Vec<IndelRecord>,
    length: usize,
}

impl DiffSequence {
    /// A genome identical to `master`.
    pub fn new(master: SharedSequence) -> Self {
        let length = master.len();
        Self {
            master,
            substitutions: BTreeMap::new(),
            indels: Vec::new(),
            length,
        }
    }

    /// Encode `sequence` against `master`.
    ///
    /// Sequences of the master's length become pure substitutions; any other
    /// length is stored as one deletion of the whole master followed by one
    /// insertion of the new bases.
    pub fn from_sequence(master: SharedSequence, sequence: &Sequence) -> Self {
        let mut diff = Self::new(master);
        if sequence.len() == diff.master.len() {
            for (position, (&new, &old)) in sequence
                .as_slice()
                .iter()
                .zip(diff.master.as_slice())
                .enumerate()
            {
                if new != old {
                    diff.substitutions.insert(position, new);
                }
            }
        } else {
            let master_len = diff.master.len();
            if master_len > 0 {
                diff.delete(0, master_len);
            }
            if !sequence.is_empty() {
                diff.insert(0, Arc::from(sequence.as_slice()));
            }
        }
        diff
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn master(&self) -> &SharedSequence {
        &self.master
    }

    /// Number of substitutions relative to the underlying (indel-adjusted)
    /// master.
    pub fn substitution_count(&self) -> usize {
        self.substitutions.len()
    }

    pub fn has_indels(&self) -> bool {
        !self.indels.is_empty()
    }

    /// Records currently in the indel log.
    pub fn indel_log_len(&self) -> usize {
        self.indels.len()
    }

    /// Substitutions in ascending position order.
    pub fn substitutions(&self) -> impl Iterator<Item = (usize, Nucleotide)> + '_ {
        self.substitutions.iter().map(|(&p, &s)| (p, s))
    }

    #[inline]
    pub fn get(&self, position: usize) -> Nucleotide {
        match self.substitutions.get(&position) {
            Some(&state) => state,
            None => self.underlying(position),
        }
    }

    /// Base at `position` ignoring substitutions.
    fn underlying(&self, position: usize) -> Nucleotide {
        let mut pos = position;
        for record in self.indels.iter().rev() {
            match record {
                IndelRecord::Insertion { position, bases } => {
                    if pos >= *position {
                        if pos < position + bases.len() {
                            return bases[pos - position];
                        }
                        pos -= bases.len();
                    }
                }
                IndelRecord::Deletion { position, count } => {
                    if pos >= *position {
                        pos += count;
                    }
                }
            }
        }
        self.master.as_slice()[pos]
    }

    pub fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Substitution { position, state } => self.substitute(*position, *state),
            Mutation::Insertion { position, bases } => {
                self.insert(*position, Arc::from(bases.as_slice()))
            }
            Mutation::Deletion { position, count } => self.delete(*position, *count),
        }
    }

    fn substitute(&mut self, position: usize, state: Nucleotide) {
        if self.underlying(position) == state {
            self.substitutions.remove(&position);
        } else {
            self.substitutions.insert(position, state);
        }
    }

    fn insert(&mut self, position: usize, bases: Arc<[Nucleotide]>) {
        let shift = bases.len();
        if shift == 0 {
            return;
        }
        let tail = self.substitutions.split_off(&position);
        self.substitutions
            .extend(tail.into_iter().map(|(p, s)| (p + shift, s)));
        self.indels.push(IndelRecord::Insertion { position, bases });
        self.length += shift;
        self.compact();
    }

    fn delete(&mut self, position: usize, count: usize) {
        let count = count.min(self.length.saturating_sub(position));
        if count == 0 {
            return;
        }
        let end = position + count;
        let tail = self.substitutions.split_off(&position);
        self.substitutions.extend(
            tail.into_iter()
                .filter(|&(p, _)| p >= end)
                .map(|(p, s)| (p - count, s)),
        );
        self.indels.push(IndelRecord::Deletion { position, count });
        self.length -= count;
        self.compact();
    }

    /// Rebase an overlong indel log. Substitutions stay keyed by current
    /// position and the underlying bases are unchanged.
    fn compact(&mut self) {
        if self.indels.len() <= INDEL_LOG_LIMIT {
            return;
        }
        let bases = self.replay_indels();
        self.indels.clear();
        let master_len = self.master.len();
        if master_len > 0 {
            self.indels.push(IndelRecord::Deletion {
                position: 0,
                count: master_len,
            });
        }
        if !bases.is_empty() {
            self.indels.push(IndelRecord::Insertion {
                position: 0,
                bases: Arc::from(bases.as_slice()),
            });
        }
        log::trace!("rebased indel log of a {} bp diff genome", self.length);
    }

    /// The master with every logged indel applied, ignoring substitutions.
    fn replay_indels(&self) -> Sequence {
        let mut seq = self.master.to_mutable();
        for record in &self.indels {
            match record {
                IndelRecord::Insertion { position, bases } => seq.insert_slice(*position, bases),
                IndelRecord::Deletion { position, count } => seq.delete_range(*position, *count),
            }
        }
        seq
    }

    /// Replay the indel log over the master and overlay substitutions.
    pub fn to_sequence(&self) -> Sequence {
        let mut seq = self.replay_indels();
        for (&position, &state) in &self.substitutions {
            seq.set(position, state);
        }
        seq
    }

    /// Count of differing positions between two diffs over the same master
    /// with no indels, by merging their substitution maps.
    pub(crate) fn substitution_distance(&self, other: &Self) -> Option<usize> {
        if self.has_indels() || other.has_indels() || !self.master.ptr_eq(&other.master) {
            return None;
        }
        let mut a = self.substitutions.iter().peekable();
        let mut b = other.substitutions.iter().peekable();
        let mut distance = 0;
        loop {
            match (a.peek(), b.peek()) {
                (Some((pa, sa)), Some((pb, sb))) => {
                    if pa < pb {
                        distance += 1;
                        a.next();
                    } else if pb < pa {
                        distance += 1;
                        b.next();
                    } else {
                        if sa != sb {
                            distance += 1;
                        }
                        a.next();
                        b.next();
                    }
                }
                (Some(_), None) => {
                    distance += 1;
                    a.next();
                }
                (None, Some(_)) => {
                    distance += 1;
                    b.next();
                }
                (None, None) => break,
            }
        }
        Some(distance)
    }
}

impl StateSource for DiffSequence {
    fn len(&self) -> usize {
        self.length
    }

    fn state(&self, position: usize) -> Nucleotide {
        self.get(position)
    }
}
