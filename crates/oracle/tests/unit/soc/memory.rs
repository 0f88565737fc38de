//! Guest Memory Tests.
//!
//! Page mapping, frame allocation, and virtual-to-host translation of the reference
//! guest memory.

use pretty_assertions::assert_eq;

use rvsim_oracle::common::constants::PAGE_SIZE;
use rvsim_oracle::common::{ErrorKind, OracleError, VirtAddr};
use rvsim_oracle::soc::memory::buffer::DramBuffer;
use rvsim_oracle::soc::memory::page_table::PageTable;
use rvsim_oracle::soc::{AddressTranslator, GuestMemory};

const RAM: usize = 16 * PAGE_SIZE as usize;

#[test]
fn unmapped_address_is_a_configuration_error() {
    let mut memory = GuestMemory::new(RAM).unwrap();
    let err = memory.read_byte(VirtAddr::new(0x40_0000)).unwrap_err();
    assert!(matches!(err, OracleError::Unmapped(0x40_0000)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn mapped_region_reads_back_writes() {
    let mut memory = GuestMemory::new(RAM).unwrap();
    let base = VirtAddr::new(0x42_0ff0);
    memory.map(base, 32).unwrap();

    // The region straddles a page boundary.
    assert_eq!(memory.page_table().len(), 2);

    let data: Vec<u8> = (0..32).collect();
    memory.write_bytes(base, &data).unwrap();
    for (i, &expected) in data.iter().enumerate() {
        let vaddr = VirtAddr::new(base.val() + i as u64);
        assert_eq!(memory.read_byte(vaddr).unwrap(), expected);
    }
}

#[test]
fn fresh_frames_are_zeroed() {
    let mut memory = GuestMemory::new(RAM).unwrap();
    let base = VirtAddr::new(0x10_0000);
    memory.map(base, PAGE_SIZE).unwrap();

    for offset in [0, 1, PAGE_SIZE / 2, PAGE_SIZE - 1] {
        assert_eq!(memory.read_byte(VirtAddr::new(base.val() + offset)).unwrap(), 0);
    }
}

#[test]
fn fill_overwrites_exactly_the_range() {
    let mut memory = GuestMemory::new(RAM).unwrap();
    let base = VirtAddr::new(0x20_0000);
    memory.map(base, 64).unwrap();
    memory.fill(base, 64, 0xFF).unwrap();

    memory.fill(VirtAddr::new(base.val() + 8), 16, 0).unwrap();

    assert_eq!(memory.read_byte(VirtAddr::new(base.val() + 7)).unwrap(), 0xFF);
    assert_eq!(memory.read_byte(VirtAddr::new(base.val() + 8)).unwrap(), 0);
    assert_eq!(memory.read_byte(VirtAddr::new(base.val() + 23)).unwrap(), 0);
    assert_eq!(memory.read_byte(VirtAddr::new(base.val() + 24)).unwrap(), 0xFF);
}

#[test]
fn overlapping_maps_keep_existing_frames() {
    let mut memory = GuestMemory::new(RAM).unwrap();
    let base = VirtAddr::new(0x30_0000);
    memory.map(base, PAGE_SIZE).unwrap();
    memory.write_bytes(base, &[0xAB]).unwrap();
    let before = memory.translate(base).unwrap();

    memory.map(base, 2 * PAGE_SIZE).unwrap();

    assert_eq!(memory.translate(base), Some(before));
    assert_eq!(memory.read_byte(base).unwrap(), 0xAB);
    assert_eq!(memory.page_table().len(), 2);
}

#[test]
fn distinct_pages_get_distinct_frames() {
    let mut memory = GuestMemory::new(RAM).unwrap();
    let a = VirtAddr::new(0x41_0000);
    let b = VirtAddr::new(0x7f_0000);
    memory.map(a, 1).unwrap();
    memory.map(b, 1).unwrap();

    assert_ne!(
        memory.translate(a).unwrap().val() / PAGE_SIZE,
        memory.translate(b).unwrap().val() / PAGE_SIZE
    );
}

#[test]
fn exhausting_dram_is_reported() {
    let mut memory = GuestMemory::new(2 * PAGE_SIZE as usize).unwrap();
    let err = memory.map(VirtAddr::new(0x50_0000), 3 * PAGE_SIZE).unwrap_err();
    assert!(matches!(err, OracleError::OutOfFrames(0x50_2000)));
}

#[test]
fn zero_length_map_is_a_no_op() {
    let mut memory = GuestMemory::new(RAM).unwrap();
    memory.map(VirtAddr::new(0x60_0000), 0).unwrap();
    assert!(memory.page_table().is_empty());
}

#[test]
fn page_table_translates_offsets_within_page() {
    let mut table = PageTable::new();
    assert_eq!(table.map(0x400, 7), None);
    assert_eq!(table.map(0x400, 3), Some(7));

    let paddr = table.translate(VirtAddr::new(0x40_0abc)).unwrap();
    assert_eq!(paddr.val(), 3 * PAGE_SIZE + 0xabc);
    assert_eq!(table.translate(VirtAddr::new(0x40_1000)), None);
}

#[test]
fn dram_buffer_is_zeroed_and_bounded() {
    let mut dram = DramBuffer::new(8192).unwrap();
    assert_eq!(dram.len(), 8192);
    assert!(dram.as_slice().iter().all(|&b| b == 0));

    *dram.get_mut(100).unwrap() = 0x5A;
    assert_eq!(dram.as_slice()[100], 0x5A);
    assert!(dram.get_mut(8192).is_none());
}

#[test]
fn empty_dram_buffer_is_valid() {
    let dram = DramBuffer::new(0).unwrap();
    assert!(dram.is_empty());
    assert!(dram.as_slice().is_empty());
}
