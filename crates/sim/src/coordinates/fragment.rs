use serde::{Deserialize, Serialize};

/// A contiguous half-open range `[start, start + length)` of genome
/// positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fragment {
    start: usize,
    length: usize,
}

impl Fragment {
    #[inline]
    pub const fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Build from half-open bounds. Returns `None` when `end < start`.
    pub fn from_bounds(start: usize, end: usize) -> Option<Self> {
        end.checked_sub(start).map(|length| Self { start, length })
    }

    #[inline(always)]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[inline(always)]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// One past the last covered position.
    #[inline(always)]
    pub const fn end(&self) -> usize {
        self.start + self.length
    }

    #[inline]
    pub const fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end()
    }

    /// See [`apply_indel`].
    #[inline]
    pub fn apply_indel(self, position: usize, delta: isize) -> Option<Self> {
        apply_indel(self, position, delta)
    }
}

/// Move a fragment through an indel at `position`.
///
/// A positive `delta` inserts `delta` bases before `position`: fragments
/// starting at or after the insertion shift right, fragments that straddle
/// it grow, and fragments ending at or before it are unchanged.
///
/// A negative `delta` deletes `|delta|` bases starting at `position`. The
/// fragment loses the overlapping bases and shifts left by the number of
/// deleted bases that preceded it. Returns `None` when nothing of the
/// fragment survives.
pub fn apply_indel(fragment: Fragment, position: usize, delta: isize) -> Option<Fragment> {
    let start = fragment.start;
    let end = fragment.end();

    if delta == 0 {
        return Some(fragment);
    }

    if delta > 0 {
        let inserted = delta as usize;
        return Some(if position <= start {
            Fragment::new(start + inserted, fragment.length)
        } else if position < end {
            Fragment::new(start, fragment.length + inserted)
        } else {
            fragment
        });
    }

    let deleted_end = position.saturating_add(delta.unsigned_abs());
    if position >= end {
        return Some(fragment);
    }
    let before = deleted_end.min(start).saturating_sub(position);
    let overlap = deleted_end.min(end).saturating_sub(position.max(start));
    let length = fragment.length - overlap;
    (length > 0).then(|| Fragment::new(start - before, length))
}
