//! Physical and Virtual Address types.
//!
//! This module defines strong types for guest addresses to prevent accidental mixing of
//! address spaces. It provides the following:
//! 1. **Type Safety:** Distinguishes guest-virtual from guest-physical addresses at compile time.
//! 2. **Address Manipulation:** Page number and page offset extraction for the page table.
//! 3. **Translation Integration:** Acts as the currency of `AddressTranslator` lookups.

use std::fmt;

use super::constants::{PAGE_OFFSET_MASK, PAGE_SHIFT};

/// A virtual address in the guest process's address space.
///
/// Symbol addresses resolved from the executable are virtual; they must be translated
/// through the process page table before the backing host byte can be reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub u64);

/// A physical address in simulated DRAM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Returns the virtual page number (address shifted right by the page size).
    pub const fn page_number(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    /// Extracts the byte offset within a 4 KiB page.
    pub const fn page_offset(self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }

    /// Returns the address `offset` bytes further on, or `None` on overflow.
    pub const fn checked_add(self, offset: u64) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Builds the physical address of `offset` within physical page `ppn`.
    pub const fn from_page(ppn: u64, offset: u64) -> Self {
        Self((ppn << PAGE_SHIFT) | (offset & PAGE_OFFSET_MASK))
    }
}

impl fmt::LowerHex for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
