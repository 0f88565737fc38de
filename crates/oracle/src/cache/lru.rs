//! Least Recently Used (LRU) victim selection.
//!
//! Each set keeps a usage stack. An accessed way moves to the top (Most Recently Used
//! position); the bottom of the stack is the victim.

/// LRU state for every set of a cache.
#[derive(Debug, Clone)]
pub struct LruPolicy {
    /// One usage stack per set. Index 0 is MRU, last index is LRU.
    usage: Vec<Vec<usize>>,
}

impl LruPolicy {
    /// Creates LRU state for `sets` sets of `ways` ways each.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            usage: (0..sets).map(|_| (0..ways).collect()).collect(),
        }
    }

    /// Moves `way` of `set` to the MRU position.
    pub fn update(&mut self, set: usize, way: usize) {
        let stack = &mut self.usage[set];
        if let Some(pos) = stack.iter().position(|&x| x == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }

    /// Returns the way at the LRU position of `set`.
    pub fn victim(&self, set: usize) -> usize {
        self.usage[set].last().copied().unwrap_or(0)
    }
}
