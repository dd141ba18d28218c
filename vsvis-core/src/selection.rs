//! Marker selections and table selection deltas.

use std::collections::BTreeSet;
use std::ops::Range;

/// Set of marker keys inside one frame subgroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every marker in the frame.
    All,
    /// A contiguous key range.
    Range(Range<usize>),
    /// An explicit key set.
    Keys(BTreeSet<usize>),
}

impl Selection {
    /// Returns true if `key` is selected.
    #[must_use]
    pub fn contains(&self, key: usize) -> bool {
        match self {
            Selection::All => true,
            Selection::Range(range) => range.contains(&key),
            Selection::Keys(keys) => keys.contains(&key),
        }
    }

    /// Returns true if nothing can be selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Selection::All => false,
            Selection::Range(range) => range.is_empty(),
            Selection::Keys(keys) => keys.is_empty(),
        }
    }
}

impl FromIterator<usize> for Selection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Selection::Keys(iter.into_iter().collect())
    }
}

impl From<Range<usize>> for Selection {
    fn from(range: Range<usize>) -> Self {
        Selection::Range(range)
    }
}

/// Net visibility change computed from one selection delta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityDelta {
    pub show: BTreeSet<usize>,
    pub hide: BTreeSet<usize>,
}

impl VisibilityDelta {
    /// Coalesces selected and deselected rows; a row present in both sets
    /// cancels out.
    #[must_use]
    pub fn coalesce(selected: &[usize], deselected: &[usize]) -> Self {
        let selected: BTreeSet<usize> = selected.iter().copied().collect();
        let deselected: BTreeSet<usize> = deselected.iter().copied().collect();
        Self {
            show: selected.difference(&deselected).copied().collect(),
            hide: deselected.difference(&selected).copied().collect(),
        }
    }

    /// Returns true if the delta changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.show.is_empty() && self.hide.is_empty()
    }
}
