use serde::{Deserialize, Serialize};

use crate::feature::Ring;

/// Cumulative value offsets marking ring boundaries inside one flattened
/// point buffer.
///
/// Holds `ring_count + 1` entries. Entry `i` is the flat start index of ring
/// `i`; the last entry is the total value count. The first entry is always 0
/// and the sequence never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingIndexTable {
    entries: Vec<u32>,
}

impl RingIndexTable {
    /// Prefix-sums ring lengths (in values). Returns `None` if the total does
    /// not fit the guest's 32-bit index type.
    pub fn from_lengths<I>(lengths: I) -> Option<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let lengths = lengths.into_iter();
        let mut entries = Vec::with_capacity(lengths.size_hint().0 + 1);
        let mut total: u32 = 0;
        entries.push(total);
        for len in lengths {
            total = total.checked_add(u32::try_from(len).ok()?)?;
            entries.push(total);
        }
        Some(Self { entries })
    }

    pub fn from_rings(rings: &[Ring]) -> Option<Self> {
        Self::from_lengths(rings.iter().map(Vec::len))
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    pub fn ring_count(&self) -> usize {
        self.entries.len() - 1
    }

    /// Total number of values covered by the table.
    pub fn total(&self) -> u32 {
        self.entries.last().copied().unwrap_or(0)
    }

    /// Value range of ring `i` within the flattened buffer.
    pub fn ring_range(&self, i: usize) -> Option<std::ops::Range<usize>> {
        let start = *self.entries.get(i)? as usize;
        let end = *self.entries.get(i + 1)? as usize;
        Some(start..end)
    }

    /// Checks a table read back from guest memory against the invariants.
    pub fn is_well_formed(entries: &[u32], value_count: u32) -> bool {
        entries.first() == Some(&0)
            && entries.windows(2).all(|w| w[0] <= w[1])
            && entries.last() == Some(&value_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_sum() {
        let table = RingIndexTable::from_lengths([4, 6]).unwrap();
        assert_eq!(table.entries(), &[0, 4, 10]);
        assert_eq!(table.ring_count(), 2);
        assert_eq!(table.total(), 10);
        assert_eq!(table.ring_range(1), Some(4..10));
        assert_eq!(table.ring_range(2), None);
    }

    #[test]
    fn test_from_rings() {
        let rings = vec![vec![0.0, 0.0, 1.0, 1.0], vec![], vec![5.0, 5.0]];
        let table = RingIndexTable::from_rings(&rings).unwrap();
        assert_eq!(table.entries(), &[0, 4, 4, 6]);
        assert!(RingIndexTable::is_well_formed(table.entries(), 6));
    }

    #[test]
    fn test_no_rings() {
        let table = RingIndexTable::from_lengths(std::iter::empty()).unwrap();
        assert_eq!(table.entries(), &[0]);
        assert_eq!(table.ring_count(), 0);
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(RingIndexTable::from_lengths([u32::MAX as usize, 1]).is_none());
    }

    #[test]
    fn test_well_formed_checks() {
        assert!(!RingIndexTable::is_well_formed(&[1, 4], 4));
        assert!(!RingIndexTable::is_well_formed(&[0, 6, 4], 4));
        assert!(!RingIndexTable::is_well_formed(&[0, 4], 6));
        assert!(!RingIndexTable::is_well_formed(&[], 0));
    }
}
