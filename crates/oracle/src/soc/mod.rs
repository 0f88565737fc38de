//! Simulated Hardware Components.
//!
//! This module organizes the hardware the oracle borrows while serving the peer,
//! including the collaborator traits, the guest memory model, and the reference
//! machine that bundles memory and caches.

/// Reference machine implementing `Platform`.
pub mod machine;

/// Guest memory: DRAM buffer, page table, and address translation.
pub mod memory;

/// Collaborator trait definitions.
pub mod traits;

pub use self::machine::Machine;
pub use self::memory::GuestMemory;
pub use self::traits::{AddressTranslator, CacheInspectable, CacheLevel, LogReset, Platform};
