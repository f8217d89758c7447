// Standard Library Imports
use std::{collections::BTreeMap, ops::RangeInclusive};

// Local Crate Imports
use crate::Coverage;

// Public API ==========================================================================================================

impl Coverage {
    /// Merges `(entry, residues)` pairs into sorted, non-overlapping ranges. Touching ranges are joined too
    pub fn from_ranges(ranges: impl IntoIterator<Item = (usize, RangeInclusive<usize>)>) -> Self {
        let mut entries: BTreeMap<usize, Vec<RangeInclusive<usize>>> = BTreeMap::new();
        for (entry, residues) in ranges {
            entries.entry(entry).or_default().push(residues);
        }

        for ranges in entries.values_mut() {
            ranges.sort_by_key(|range| (*range.start(), *range.end()));
            let mut merged: Vec<RangeInclusive<usize>> = Vec::with_capacity(ranges.len());
            for range in ranges.drain(..) {
                match merged.last_mut() {
                    Some(last) if *range.start() <= last.end() + 1 => {
                        let end = *last.end().max(range.end());
                        *last = *last.start()..=end;
                    }
                    _ => merged.push(range),
                }
            }
            *ranges = merged;
        }

        Self(entries)
    }

    /// Protein entries with at least one covered residue
    pub fn entries(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.keys().copied()
    }

    #[must_use]
    pub fn ranges(&self, entry: usize) -> &[RangeInclusive<usize>] {
        self.0.get(&entry).map_or(&[], Vec::as_slice)
    }

    /// The number of covered residues in `entry`
    #[must_use]
    pub fn covered(&self, entry: usize) -> usize {
        self.ranges(entry).iter().map(|range| range.end() - range.start() + 1).sum()
    }

    /// One flag per residue of a protein `length` residues long; `bitmap[0]` is residue 1
    #[must_use]
    pub fn bitmap(&self, entry: usize, length: usize) -> Vec<bool> {
        let mut bitmap = vec![false; length];
        for range in self.ranges(entry) {
            for residue in range.clone() {
                if let Some(flag) = residue.checked_sub(1).and_then(|i| bitmap.get_mut(i)) {
                    *flag = true;
                }
            }
        }
        bitmap
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_overlapping_and_touching_ranges() {
        let coverage = Coverage::from_ranges([
            (0, 15..=22),
            (0, 1..=2),
            (1, 3..=9),
            (0, 10..=17),
            (0, 3..=5),
            (0, 30..=31),
            (0, 16..=18),
        ]);
        assert_eq!(coverage.entries().collect::<Vec<_>>(), [0, 1]);
        assert_eq!(coverage.ranges(0), [1..=5, 10..=22, 30..=31]);
        assert_eq!(coverage.ranges(1), [3..=9]);
        assert!(coverage.ranges(2).is_empty());
        assert_eq!(coverage.covered(0), 5 + 13 + 2);
    }

    #[test]
    fn bitmaps() {
        let coverage = Coverage::from_ranges([(0, 2..=3), (0, 6..=9)]);
        let bitmap: String = coverage
            .bitmap(0, 7)
            .into_iter()
            .map(|covered| if covered { '#' } else { '.' })
            .collect();
        assert_eq!(bitmap, ".##..##");
        assert_eq!(coverage.bitmap(1, 3), [false; 3]);
    }

    #[test]
    fn empty_coverage() {
        let coverage = Coverage::from_ranges([]);
        assert!(coverage.is_empty());
        assert_eq!(coverage, Coverage::default());
    }
}
