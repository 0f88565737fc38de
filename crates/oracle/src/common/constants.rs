//! Global Harness Constants.
//!
//! This module defines the fixed sizes shared by the guest image, the wire protocol,
//! and the simulated memory. It includes:
//! 1. **Memory Constants:** Page sizes, masks, and shifts for the guest page table.
//! 2. **Region Constants:** Sizes of the injected code, sandbox, and registers regions.
//! 3. **Image Constants:** Symbols the guest executable must define.

/// Page size in bytes (4KB).
pub const PAGE_SIZE: u64 = 4096;

/// Number of bits to shift to convert between bytes and pages.
pub const PAGE_SHIFT: u64 = 12;

/// Mask for extracting the page offset from an address.
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;

/// Maximum size of an injected test case, and the extent of the `code` region.
pub const MAX_CODE_SIZE: u64 = 4096;

/// Extent of the `sandbox` region.
pub const MAX_SANDBOX_SIZE: u64 = 8192;

/// Extent of the `registers` region (30 general-purpose registers, 8 bytes each).
pub const MAX_REGISTERS_SIZE: u64 = 30 * 8;

/// AArch64 `NOP` encoding, used to pad the code region past the end of a test case.
pub const AARCH64_NOP: u32 = 0xD503201F;

/// Symbol naming the code region.
pub const SYMBOL_CODE: &str = "code";

/// Symbol naming the sandbox region.
pub const SYMBOL_SANDBOX: &str = "sandbox";

/// Symbol naming the registers region.
pub const SYMBOL_REGISTERS: &str = "registers";

/// Symbols every guest executable must define, in the order they are checked.
pub const REQUIRED_SYMBOLS: [&str; 3] = [SYMBOL_CODE, SYMBOL_SANDBOX, SYMBOL_REGISTERS];

/// Log target for frames received from and sent to the peer.
pub const LOG_COMMANDS: &str = "rvsim_oracle::commands";

/// Log target for the injected code dump.
pub const LOG_EXEC: &str = "rvsim_oracle::exec";

/// Log target for per-trace results and valid cache lines.
pub const LOG_RESULTS: &str = "rvsim_oracle::results";
