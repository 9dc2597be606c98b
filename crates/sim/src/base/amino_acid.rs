use core::fmt;

use serde::{Deserialize, Serialize};

use super::Nucleotide;

/// The twenty standard amino acids plus the stop signal.
///
/// Discriminants are the state indices used by amino-acid fitness tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AminoAcid {
    Ala = 0,
    Cys,
    Asp,
    Glu,
    Phe,
    Gly,
    His,
    Ile,
    Lys,
    Leu,
    Met,
    Asn,
    Pro,
    Gln,
    Arg,
    Ser,
    Thr,
    Val,
    Trp,
    Tyr,
    Stop,
}

/// Standard genetic code, indexed by `16 * first + 4 * second + third` with
/// bases in A, C, G, T order.
const STANDARD_CODE: &[u8; 64] =
    b"KNKNTTTTRSRSIIMIQHQHPPPPRRRRLLLLEDEDAAAAGGGGVVVV*Y*YSSSS*CWCLFLF";

impl AminoAcid {
    /// Number of amino-acid states, stop included.
    pub const COUNT: usize = 21;

    const BY_INDEX: [AminoAcid; 21] = [
        Self::Ala,
        Self::Cys,
        Self::Asp,
        Self::Glu,
        Self::Phe,
        Self::Gly,
        Self::His,
        Self::Ile,
        Self::Lys,
        Self::Leu,
        Self::Met,
        Self::Asn,
        Self::Pro,
        Self::Gln,
        Self::Arg,
        Self::Ser,
        Self::Thr,
        Self::Val,
        Self::Trp,
        Self::Tyr,
        Self::Stop,
    ];

    #[inline]
    pub const fn from_index(idx: u8) -> Option<Self> {
        if (idx as usize) < Self::COUNT {
            Some(Self::BY_INDEX[idx as usize])
        } else {
            None
        }
    }

    #[inline(always)]
    pub const fn to_index(self) -> u8 {
        self as u8
    }

    /// Parse a one-letter code (`*` for stop).
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code.to_ascii_uppercase() {
            b'A' => Self::Ala,
            b'C' => Self::Cys,
            b'D' => Self::Asp,
            b'E' => Self::Glu,
            b'F' => Self::Phe,
            b'G' => Self::Gly,
            b'H' => Self::His,
            b'I' => Self::Ile,
            b'K' => Self::Lys,
            b'L' => Self::Leu,
            b'M' => Self::Met,
            b'N' => Self::Asn,
            b'P' => Self::Pro,
            b'Q' => Self::Gln,
            b'R' => Self::Arg,
            b'S' => Self::Ser,
            b'T' => Self::Thr,
            b'V' => Self::Val,
            b'W' => Self::Trp,
            b'Y' => Self::Tyr,
            b'*' => Self::Stop,
            _ => return None,
        })
    }

    pub const fn code(self) -> char {
        match self {
            Self::Ala => 'A',
            Self::Cys => 'C',
            Self::Asp => 'D',
            Self::Glu => 'E',
            Self::Phe => 'F',
            Self::Gly => 'G',
            Self::His => 'H',
            Self::Ile => 'I',
            Self::Lys => 'K',
            Self::Leu => 'L',
            Self::Met => 'M',
            Self::Asn => 'N',
            Self::Pro => 'P',
            Self::Gln => 'Q',
            Self::Arg => 'R',
            Self::Ser => 'S',
            Self::Thr => 'T',
            Self::Val => 'V',
            Self::Trp => 'W',
            Self::Tyr => 'Y',
            Self::Stop => '*',
        }
    }

    /// Translate a codon with the standard genetic code.
    #[inline]
    pub fn translate(codon: [Nucleotide; 3]) -> Self {
        let index = 16 * codon[0].to_index() as usize
            + 4 * codon[1].to_index() as usize
            + codon[2].to_index() as usize;
        // Every byte of the table is a valid one-letter code.
        Self::from_code(STANDARD_CODE[index]).unwrap_or(Self::Stop)
    }
}

impl fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
