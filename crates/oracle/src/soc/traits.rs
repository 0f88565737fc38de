//! Capability traits for the simulated hardware the oracle drives.
//!
//! The protocol engine never owns simulated memory or cache contents. It borrows them
//! through the traits in this module on every call. It provides:
//! 1. **Translation:** `AddressTranslator` turns guest virtual addresses into host bytes.
//! 2. **Inspection:** `CacheInspectable` scans, writes back, and invalidates cache lines.
//! 3. **Bundling:** `Platform` hands the engine the memory and the three tracked caches.
//! 4. **Diagnostics:** `LogReset` lets the peer truncate the debug log between campaigns.

use std::io;

use tracing::debug;

use crate::cache::CacheSnapshot;
use crate::common::constants::LOG_RESULTS;
use crate::common::{OracleError, Result, VirtAddr};

/// Virtual-to-host translation for a guest process.
///
/// Implementors translate through the process page table and then through the simulated
/// DRAM's physical-to-host mapping. The helpers below work a byte at a time, which is
/// plenty for regions of a few kilobytes.
pub trait AddressTranslator {
    /// Returns the host byte backing guest address `vaddr`.
    fn to_host(&mut self, vaddr: VirtAddr) -> Result<&mut u8>;

    /// Reads the guest byte at `vaddr`.
    fn read_byte(&mut self, vaddr: VirtAddr) -> Result<u8> {
        self.to_host(vaddr).map(|byte| *byte)
    }

    /// Copies `data` into guest memory starting at `base`.
    fn write_bytes(&mut self, base: VirtAddr, data: &[u8]) -> Result<()> {
        for (i, &value) in data.iter().enumerate() {
            *self.to_host(byte_at(base, i as u64)?)? = value;
        }
        Ok(())
    }

    /// Sets `len` guest bytes starting at `base` to `value`.
    fn fill(&mut self, base: VirtAddr, len: u64, value: u8) -> Result<()> {
        for i in 0..len {
            *self.to_host(byte_at(base, i)?)? = value;
        }
        Ok(())
    }
}

/// Address of byte `i` of a region starting at `base`.
fn byte_at(base: VirtAddr, i: u64) -> Result<VirtAddr> {
    base.checked_add(i).ok_or(OracleError::Unmapped(base.val()))
}

/// A cache whose line state can be observed and reset from outside the simulation.
pub trait CacheInspectable {
    /// Visits every line, valid or not, as `(tag, is_valid)`.
    ///
    /// The order is whatever the cache's tag store yields, but it must be the same across
    /// repeated scans of unchanged state.
    fn scan_all(&self, visit: &mut dyn FnMut(u64, bool));

    /// Writes dirty lines back to memory. Validity is preserved.
    fn writeback(&mut self);

    /// Drops the validity of every line.
    fn invalidate(&mut self);

    /// Captures the validity of every line in scan order.
    fn snapshot(&self) -> CacheSnapshot {
        let mut valid = Vec::new();
        self.scan_all(&mut |_, is_valid| valid.push(is_valid));
        CacheSnapshot::new(valid)
    }

    /// Logs the scan index and tag of every valid line.
    fn log_valid_lines(&self) {
        debug!(target: LOG_RESULTS, "valid cache blocks:");
        let mut index = 0usize;
        self.scan_all(&mut |tag, is_valid| {
            if is_valid {
                debug!(target: LOG_RESULTS, "  {index}. tag={tag:#x}");
            }
            index += 1;
        });
    }
}

/// The caches the oracle tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheLevel {
    /// L1 data cache; its validity is reported to the peer.
    L1Data,
    /// L1 instruction cache.
    L1Instruction,
    /// Unified L2 cache.
    L2,
}

impl CacheLevel {
    /// Order in which caches are written back and invalidated before a trace.
    pub const FLUSH_ORDER: [Self; 3] = [Self::L1Data, Self::L1Instruction, Self::L2];
}

/// Everything the protocol engine borrows from the host simulation.
pub trait Platform {
    /// The guest process's memory.
    fn memory(&mut self) -> &mut dyn AddressTranslator;

    /// One of the tracked caches.
    fn cache(&mut self, level: CacheLevel) -> &mut dyn CacheInspectable;

    /// Resets the diagnostic log. Hosts without one ignore the request.
    fn reset_log(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A diagnostic log that can be emptied on request.
pub trait LogReset: Send {
    /// Discards everything logged so far.
    fn reset(&self) -> io::Result<()>;
}
