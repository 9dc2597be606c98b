use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::InvalidNucleotide;

/// A DNA nucleotide base.
///
/// `Nucleotide` is a compact, `Copy` representation backed by a single byte.
/// The mapping of variants to integers is stable and doubles as the state
/// index used by fitness factors and frequency tables (A=0, C=1, G=2, T=3).
/// The derived ordering follows the same indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Nucleotide {
    A = 0,
    C = 1,
    G = 2,
    T = 3,
}

impl Nucleotide {
    /// Number of nucleotide states.
    pub const COUNT: usize = 4;

    /// All states in index order.
    pub const ALL: [Nucleotide; 4] = [Self::A, Self::C, Self::G, Self::T];

    /// Convert from a state index (0-3).
    #[inline(always)]
    pub const fn from_index(idx: u8) -> Option<Self> {
        match idx {
            0 => Some(Self::A),
            1 => Some(Self::C),
            2 => Some(Self::G),
            3 => Some(Self::T),
            _ => None,
        }
    }

    /// Convert to the compact state index (0-3).
    #[inline(always)]
    pub const fn to_index(self) -> u8 {
        self as u8
    }

    /// Convert from an ASCII byte, accepting either case.
    #[inline]
    pub const fn from_ascii(byte: u8) -> Option<Self> {
        match byte {
            b'A' | b'a' => Some(Self::A),
            b'C' | b'c' => Some(Self::C),
            b'G' | b'g' => Some(Self::G),
            b'T' | b't' => Some(Self::T),
            _ => None,
        }
    }

    /// Convert to an uppercase ASCII byte.
    #[inline(always)]
    pub const fn to_ascii(self) -> u8 {
        match self {
            Self::A => b'A',
            Self::C => b'C',
            Self::G => b'G',
            Self::T => b'T',
        }
    }

    #[inline(always)]
    pub const fn to_char(self) -> char {
        self.to_ascii() as char
    }

    /// Return true if the nucleotide is a purine (A or G).
    #[inline(always)]
    pub const fn is_purine(self) -> bool {
        matches!(self, Self::A | Self::G)
    }

    /// Return true when a change from `self` to `other` is a transition
    /// (purine <-> purine or pyrimidine <-> pyrimidine).
    #[inline]
    pub const fn is_transition_to(self, other: Self) -> bool {
        self as u8 != other as u8 && self.is_purine() == other.is_purine()
    }

    /// Draw a uniformly random base.
    #[inline]
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::COUNT)]
    }
}

impl TryFrom<u8> for Nucleotide {
    type Error = InvalidNucleotide;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_ascii(byte).ok_or(InvalidNucleotide(byte))
    }
}

impl From<Nucleotide> for u8 {
    #[inline(always)]
    fn from(nuc: Nucleotide) -> u8 {
        nuc.to_index()
    }
}

impl From<Nucleotide> for char {
    #[inline(always)]
    fn from(nuc: Nucleotide) -> char {
        nuc.to_char()
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}
