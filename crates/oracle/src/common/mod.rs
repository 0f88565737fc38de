//! Common types and constants used throughout the oracle.
//!
//! This module provides the building blocks shared by the resolver, the memory model,
//! and the protocol engine. It includes:
//! 1. **Address Types:** Strong types for guest virtual and physical addresses.
//! 2. **Constants:** Region sizes, page geometry, and required symbol names.
//! 3. **Error Handling:** The crate-wide error type and its classification.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Region sizes, page geometry, and symbol names.
pub mod constants;

/// Error types and error classification.
pub mod error;

pub use addr::{PhysAddr, VirtAddr};
pub use error::{ErrorKind, OracleError, Result};
