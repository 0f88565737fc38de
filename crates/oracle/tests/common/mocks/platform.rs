//! Platform that records memory and cache operations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rvsim_oracle::common::{Result, VirtAddr};
use rvsim_oracle::soc::{AddressTranslator, CacheInspectable, CacheLevel, Platform};

/// One maintenance operation issued to a cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOp {
    /// `writeback()` on the given level.
    Writeback(CacheLevel),
    /// `invalidate()` on the given level.
    Invalidate(CacheLevel),
}

/// Operation log shared by the caches of one platform.
pub type OpLog = Rc<RefCell<Vec<CacheOp>>>;

/// Sparse guest memory where every address is mapped.
///
/// Only writes are counted; `read_byte` does not touch the map.
#[derive(Debug, Default)]
pub struct FlatMemory {
    bytes: HashMap<u64, u8>,
    writes: usize,
}

impl FlatMemory {
    /// Number of bytes handed out for writing.
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// The byte at `addr`; never-written bytes read as zero.
    pub fn byte(&self, addr: u64) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    /// `len` bytes starting at `base`.
    pub fn region(&self, base: u64, len: usize) -> Vec<u8> {
        (0..len as u64).map(|i| self.byte(base + i)).collect()
    }

    /// Sets every byte of `[base, base + len)` to `value` without counting writes.
    pub fn preset(&mut self, base: u64, len: usize, value: u8) {
        for i in 0..len as u64 {
            let _ = self.bytes.insert(base + i, value);
        }
    }
}

impl AddressTranslator for FlatMemory {
    fn to_host(&mut self, vaddr: VirtAddr) -> Result<&mut u8> {
        self.writes += 1;
        Ok(self.bytes.entry(vaddr.val()).or_insert(0))
    }

    fn read_byte(&mut self, vaddr: VirtAddr) -> Result<u8> {
        Ok(self.byte(vaddr.val()))
    }
}

/// Cache with fixed `(tag, valid)` lines that logs maintenance operations.
#[derive(Debug)]
pub struct RecordingCache {
    level: CacheLevel,
    lines: Vec<(u64, bool)>,
    log: OpLog,
}

impl RecordingCache {
    /// A cache of `count` invalid lines tagged with their index.
    pub fn new(level: CacheLevel, count: usize, log: OpLog) -> Self {
        Self {
            level,
            lines: (0..count as u64).map(|tag| (tag, false)).collect(),
            log,
        }
    }

    /// Marks line `index` valid, as if the guest had touched it.
    pub fn fill(&mut self, index: usize, tag: u64) {
        self.lines[index] = (tag, true);
    }

    /// Number of valid lines.
    pub fn valid_count(&self) -> usize {
        self.lines.iter().filter(|(_, valid)| *valid).count()
    }
}

impl CacheInspectable for RecordingCache {
    fn scan_all(&self, visit: &mut dyn FnMut(u64, bool)) {
        for &(tag, valid) in &self.lines {
            visit(tag, valid);
        }
    }

    fn writeback(&mut self) {
        self.log.borrow_mut().push(CacheOp::Writeback(self.level));
    }

    fn invalidate(&mut self) {
        self.log.borrow_mut().push(CacheOp::Invalidate(self.level));
        for line in &mut self.lines {
            line.1 = false;
        }
    }
}

/// Platform whose memory and caches record everything the engine does to them.
#[derive(Debug)]
pub struct RecordingPlatform {
    /// Guest memory.
    pub memory: FlatMemory,
    /// L1 data cache.
    pub l1_d: RecordingCache,
    /// L1 instruction cache.
    pub l1_i: RecordingCache,
    /// L2 cache.
    pub l2: RecordingCache,
    /// Cache operations in issue order.
    pub log: OpLog,
    /// Number of RESET_LOG requests served.
    pub resets: usize,
}

impl RecordingPlatform {
    /// Line count of the recording L1 data cache.
    pub const L1_D_LINES: usize = 16;

    /// A platform with empty memory and all-invalid caches.
    pub fn new() -> Self {
        let log = OpLog::default();
        Self {
            memory: FlatMemory::default(),
            l1_d: RecordingCache::new(CacheLevel::L1Data, Self::L1_D_LINES, Rc::clone(&log)),
            l1_i: RecordingCache::new(CacheLevel::L1Instruction, 8, Rc::clone(&log)),
            l2: RecordingCache::new(CacheLevel::L2, 32, Rc::clone(&log)),
            log,
            resets: 0,
        }
    }

    /// Cache operations issued so far.
    pub fn ops(&self) -> Vec<CacheOp> {
        self.log.borrow().clone()
    }
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for RecordingPlatform {
    fn memory(&mut self) -> &mut dyn AddressTranslator {
        &mut self.memory
    }

    fn cache(&mut self, level: CacheLevel) -> &mut dyn CacheInspectable {
        match level {
            CacheLevel::L1Data => &mut self.l1_d,
            CacheLevel::L1Instruction => &mut self.l1_i,
            CacheLevel::L2 => &mut self.l2,
        }
    }

    fn reset_log(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }
}
