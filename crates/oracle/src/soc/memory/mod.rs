//! Guest Memory.
//!
//! This module models the memory the oracle injects into. It provides:
//! 1. **Buffer:** Backing storage (`DramBuffer`) for simulated DRAM contents.
//! 2. **Page Table:** The guest process's virtual-to-physical page mapping.
//! 3. **Guest Memory:** Frame allocation plus the `AddressTranslator` implementation that
//!    chains page-table translation with the DRAM's physical-to-host mapping.

/// DRAM buffer implementation (mmap or boxed slice) for raw byte storage.
pub mod buffer;

/// Virtual-to-physical page mapping.
pub mod page_table;

use tracing::debug;

use self::buffer::DramBuffer;
use self::page_table::PageTable;
use crate::common::constants::PAGE_SIZE;
use crate::common::{OracleError, PhysAddr, Result, VirtAddr};
use crate::soc::traits::AddressTranslator;

/// Simulated DRAM together with the guest process page table.
#[derive(Debug)]
pub struct GuestMemory {
    dram: DramBuffer,
    page_table: PageTable,
    next_frame: u64,
}

impl GuestMemory {
    /// Creates `ram_size` bytes of zeroed DRAM with nothing mapped.
    pub fn new(ram_size: usize) -> Result<Self> {
        Ok(Self {
            dram: DramBuffer::new(ram_size)?,
            page_table: PageTable::new(),
            next_frame: 0,
        })
    }

    /// Backs `[base, base + len)` with fresh zeroed frames.
    ///
    /// Pages that are already mapped keep their frames, so overlapping regions are fine.
    pub fn map(&mut self, base: VirtAddr, len: u64) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let last = base
            .checked_add(len - 1)
            .ok_or(OracleError::Unmapped(base.val()))?;
        for vpn in base.page_number()..=last.page_number() {
            if self.page_table.is_mapped(vpn) {
                continue;
            }
            let ppn = self.allocate_frame(vpn)?;
            let _ = self.page_table.map(vpn, ppn);
        }
        debug!(base = %format_args!("{base:#x}"), len, "mapped guest region");
        Ok(())
    }

    fn allocate_frame(&mut self, vpn: u64) -> Result<u64> {
        let end = (self.next_frame + 1) * PAGE_SIZE;
        if end > self.dram.len() as u64 {
            return Err(OracleError::OutOfFrames(vpn * PAGE_SIZE));
        }
        let ppn = self.next_frame;
        self.next_frame += 1;
        Ok(ppn)
    }

    /// Translates `vaddr` through the page table.
    pub fn translate(&self, vaddr: VirtAddr) -> Option<PhysAddr> {
        self.page_table.translate(vaddr)
    }

    /// The guest process page table.
    pub const fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    /// The simulated DRAM.
    pub const fn dram(&self) -> &DramBuffer {
        &self.dram
    }
}

impl AddressTranslator for GuestMemory {
    fn to_host(&mut self, vaddr: VirtAddr) -> Result<&mut u8> {
        let paddr = self
            .page_table
            .translate(vaddr)
            .ok_or(OracleError::Unmapped(vaddr.val()))?;
        usize::try_from(paddr.val())
            .ok()
            .and_then(|offset| self.dram.get_mut(offset))
            .ok_or(OracleError::OutsideDram(paddr.val()))
    }
}
