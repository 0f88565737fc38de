//! Set-Associative Cache Model.
//!
//! This module implements the reference cache the oracle inspects. It models line
//! placement, LRU replacement, and dirty tracking; timing is left to the host simulation.
//! It provides:
//! 1. **Lookup and fill:** `CacheSim::access` installs lines on misses.
//! 2. **Inspection:** A stable set-major, way-minor scan of every line.
//! 3. **Maintenance:** Writeback (clean dirty lines) and invalidation (drop all lines).

/// Least Recently Used victim selection.
pub mod lru;

/// Validity snapshots reported to the peer.
pub mod snapshot;

pub use self::snapshot::CacheSnapshot;

use tracing::trace;

use self::lru::LruPolicy;
use crate::common::constants::LOG_RESULTS;
use crate::config::CacheConfig;
use crate::soc::traits::CacheInspectable;

/// Cache line entry containing tag, validity, and dirty bits.
#[derive(Clone, Debug, Default)]
struct CacheLine {
    tag: u64,
    valid: bool,
    dirty: bool,
}

/// Set-associative cache with LRU replacement.
#[derive(Debug, Clone)]
pub struct CacheSim {
    lines: Vec<CacheLine>,
    num_sets: usize,
    ways: usize,
    line_bytes: usize,
    policy: LruPolicy,
}

impl CacheSim {
    /// Creates a cache with the geometry given by `config`.
    ///
    /// Zero-valued fields fall back to a 4 KiB, 64-byte-line, direct-mapped cache.
    pub fn new(config: &CacheConfig) -> Self {
        let ways = if config.ways == 0 { 1 } else { config.ways };
        let line_bytes = if config.line_bytes == 0 {
            64
        } else {
            config.line_bytes
        };
        let size = if config.size_bytes == 0 {
            4096
        } else {
            config.size_bytes
        };

        let num_sets = (size / line_bytes / ways).max(1);

        Self {
            lines: vec![CacheLine::default(); num_sets * ways],
            num_sets,
            ways,
            line_bytes,
            policy: LruPolicy::new(num_sets, ways),
        }
    }

    /// Total number of lines (sets × ways).
    pub const fn line_count(&self) -> usize {
        self.num_sets * self.ways
    }

    /// Line size in bytes.
    pub const fn line_bytes(&self) -> usize {
        self.line_bytes
    }

    const fn set_and_tag(&self, addr: u64) -> (usize, u64) {
        let line = addr / self.line_bytes as u64;
        let set = (line % self.num_sets as u64) as usize;
        (set, line / self.num_sets as u64)
    }

    /// Checks if the cache holds a valid line for `addr`.
    pub fn contains(&self, addr: u64) -> bool {
        let (set, tag) = self.set_and_tag(addr);
        self.lines[set * self.ways..(set + 1) * self.ways]
            .iter()
            .any(|line| line.valid && line.tag == tag)
    }

    /// Accesses `addr`, installing its line on a miss.
    ///
    /// Returns `true` on a hit. A write marks the line dirty.
    pub fn access(&mut self, addr: u64, is_write: bool) -> bool {
        let (set, tag) = self.set_and_tag(addr);
        let base = set * self.ways;

        for way in 0..self.ways {
            let line = &mut self.lines[base + way];
            if line.valid && line.tag == tag {
                line.dirty |= is_write;
                self.policy.update(set, way);
                return true;
            }
        }

        let way = (0..self.ways)
            .find(|&way| !self.lines[base + way].valid)
            .unwrap_or_else(|| self.policy.victim(set));
        self.lines[base + way] = CacheLine {
            tag,
            valid: true,
            dirty: is_write,
        };
        self.policy.update(set, way);
        false
    }

    /// Number of dirty lines.
    pub fn dirty_count(&self) -> usize {
        self.lines.iter().filter(|line| line.valid && line.dirty).count()
    }

    /// Logs the tag of every line at trace level.
    pub fn inspect(&self) {
        for (index, line) in self.lines.iter().enumerate() {
            trace!(target: LOG_RESULTS, index, tag = line.tag, valid = line.valid);
        }
    }
}

impl CacheInspectable for CacheSim {
    fn scan_all(&self, visit: &mut dyn FnMut(u64, bool)) {
        for line in &self.lines {
            visit(line.tag, line.valid);
        }
    }

    fn writeback(&mut self) {
        for line in &mut self.lines {
            line.dirty = false;
        }
    }

    fn invalidate(&mut self) {
        for line in &mut self.lines {
            line.valid = false;
            line.dirty = false;
        }
    }
}
