//! Cache validity snapshots.

/// Per-line validity of a cache at one instant, in the cache's scan order.
///
/// The length always equals the cache's total line count, however many lines are valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    valid: Vec<bool>,
}

impl CacheSnapshot {
    /// Wraps a validity vector produced by a full scan.
    pub const fn new(valid: Vec<bool>) -> Self {
        Self { valid }
    }

    /// Number of lines in the snapshot.
    pub fn len(&self) -> usize {
        self.valid.len()
    }

    /// Returns `true` for a cache with no lines.
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    /// Number of valid lines.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Validity of line `index` in scan order.
    pub fn is_valid(&self, index: usize) -> Option<bool> {
        self.valid.get(index).copied()
    }

    /// Iterates over line validity in scan order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.valid.iter().copied()
    }

    /// Encodes the snapshot as one byte per line, `1` for valid and `0` for invalid.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        self.valid.iter().map(|&v| u8::from(v)).collect()
    }
}

impl FromIterator<bool> for CacheSnapshot {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
