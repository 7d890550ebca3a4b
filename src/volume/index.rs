//! Chapter-number to volume lookup built from the catalog's chapter listing.

use std::collections::HashMap;

use crate::catalog::ChapterListing;

/// Exact-match map from chapter number to volume.
///
/// Keys are the bit patterns of normalized `f64` values (`-0.0` folded into
/// `0.0`, NaN rejected), so `12.5` and `"12.50"` land on the same entry
/// while `12.4999` does not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeIndex {
    entries: HashMap<u64, u32>,
}

impl VolumeIndex {
    /// Builds the index; the first listing for a chapter wins.
    #[must_use]
    pub fn from_listing(listing: &[ChapterListing]) -> Self {
        let mut entries = HashMap::with_capacity(listing.len());
        for item in listing {
            if let Some(key) = chapter_key(item.number) {
                entries.entry(key).or_insert(item.volume);
            }
        }
        Self { entries }
    }

    /// Volume for `number`, if the listing contained it.
    #[must_use]
    pub fn get(&self, number: f64) -> Option<u32> {
        self.entries.get(&chapter_key(number)?).copied()
    }

    /// Number of distinct chapters indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the listing produced no usable entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn chapter_key(number: f64) -> Option<u64> {
    if number.is_nan() {
        return None;
    }
    let normalized = if number == 0.0 { 0.0 } else { number };
    Some(normalized.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(pairs: &[(f64, u32)]) -> Vec<ChapterListing> {
        pairs
            .iter()
            .map(|&(number, volume)| ChapterListing { number, volume })
            .collect()
    }

    #[test]
    fn test_index_exact_match_only() {
        let index = VolumeIndex::from_listing(&listing(&[(12.0, 2), (12.5, 2), (13.0, 3)]));
        assert_eq!(index.get(12.0), Some(2));
        assert_eq!(index.get(12.5), Some(2));
        assert_eq!(index.get(13.0), Some(3));
        assert_eq!(index.get(12.4), None);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_index_first_entry_wins() {
        let index = VolumeIndex::from_listing(&listing(&[(5.0, 1), (5.0, 9)]));
        assert_eq!(index.get(5.0), Some(1));
    }

    #[test]
    fn test_index_normalizes_negative_zero_and_rejects_nan() {
        let index = VolumeIndex::from_listing(&listing(&[(-0.0, 1), (f64::NAN, 4)]));
        assert_eq!(index.get(0.0), Some(1));
        assert_eq!(index.get(f64::NAN), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_empty_index() {
        let index = VolumeIndex::default();
        assert!(index.is_empty());
        assert_eq!(index.get(1.0), None);
    }
}
