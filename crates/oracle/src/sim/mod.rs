//! Session assembly.
//!
//! Reads the guest executable's symbol table to locate the injected regions, and drives
//! a session by alternating between the protocol engine and the guest executor.

/// Session driver and the guest executor boundary.
pub mod session;

/// ELF symbol-table reader.
pub mod symbols;

pub use self::session::{GuestExecutor, Oracle};
pub use self::symbols::{RegionLayout, SymbolAddresses, SymbolImage};
