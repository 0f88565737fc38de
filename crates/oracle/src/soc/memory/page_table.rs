//! Guest process page table.
//!
//! A flat map from virtual page number to physical page number at 4 KiB granularity.
//! The oracle only needs the translation direction the host simulation's process page
//! table provides; permissions and multi-level walks are the CPU model's business.

use std::collections::BTreeMap;

use crate::common::{PhysAddr, VirtAddr};

/// Virtual-to-physical page mapping of one guest process.
#[derive(Debug, Clone, Default)]
pub struct PageTable {
    entries: BTreeMap<u64, u64>,
}

impl PageTable {
    /// Creates an empty page table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps virtual page `vpn` to physical page `ppn`, returning the previous mapping.
    pub fn map(&mut self, vpn: u64, ppn: u64) -> Option<u64> {
        self.entries.insert(vpn, ppn)
    }

    /// Returns `true` if virtual page `vpn` is mapped.
    pub fn is_mapped(&self, vpn: u64) -> bool {
        self.entries.contains_key(&vpn)
    }

    /// Translates `vaddr`, or returns `None` if its page is unmapped.
    pub fn translate(&self, vaddr: VirtAddr) -> Option<PhysAddr> {
        self.entries
            .get(&vaddr.page_number())
            .map(|&ppn| PhysAddr::from_page(ppn, vaddr.page_offset()))
    }

    /// Number of mapped pages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no page is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
