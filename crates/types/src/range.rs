//! Inclusive block-number ranges for range-scoped operations.

use serde::{Deserialize, Serialize};

/// An inclusive `[low, high]` span of block numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    /// First block in the range.
    pub low: u64,
    /// Last block in the range.
    pub high: u64,
}

impl BlockRange {
    /// Create a range, normalizing a reversed pair.
    pub const fn new(low: u64, high: u64) -> Self {
        if low <= high {
            Self { low, high }
        } else {
            Self { low: high, high: low }
        }
    }

    /// Whether the block number falls inside the range.
    pub const fn contains(&self, block: u64) -> bool {
        self.low <= block && block <= self.high
    }

    /// Number of blocks spanned.
    pub const fn len(&self) -> u64 {
        self.high - self.low + 1
    }

    /// Always false: a range spans at least one block.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate the block numbers in the range.
    pub fn blocks(&self) -> impl Iterator<Item = u64> {
        self.low..=self.high
    }
}

impl From<(u64, u64)> for BlockRange {
    fn from((low, high): (u64, u64)) -> Self {
        Self::new(low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_reversed_bounds() {
        let r = BlockRange::new(9, 3);
        assert_eq!(r, BlockRange { low: 3, high: 9 });
        assert_eq!(r.len(), 7);
    }

    #[test]
    fn contains_is_inclusive() {
        let r = BlockRange::new(5, 7);
        assert!(r.contains(5));
        assert!(r.contains(7));
        assert!(!r.contains(8));
    }
}
