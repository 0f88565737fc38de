//! Test-oracle harness for cache side-channel fuzzing.
//!
//! This crate lets an external test-case generator drive a simulated machine and read back
//! which data-cache lines a test case touched. It provides:
//! 1. **IPC:** The abstract-socket channel, the wire protocol, and the protocol engine.
//! 2. **Symbols:** Location of the `code`, `sandbox`, and `registers` regions in the guest ELF.
//! 3. **SoC:** Collaborator traits plus reference guest memory and machine implementations.
//! 4. **Cache:** A set-associative cache model whose line validity can be inspected.
//! 5. **Session:** Configuration loading and the loop that alternates peer and guest.

/// Set-associative cache model and validity snapshots.
pub mod cache;
/// Common types and constants (addresses, region sizes, errors).
pub mod common;
/// Oracle configuration (defaults and hierarchical config structures).
pub mod config;
/// Fuzzer channel, wire protocol, and protocol engine.
pub mod ipc;
/// Symbol resolution and session driver.
pub mod sim;
/// Simulated hardware (collaborator traits, guest memory, machine).
pub mod soc;

/// Root configuration type; use `Config::default()` or load from JSON.
pub use crate::config::Config;
/// Library error type and its classification.
pub use crate::common::{ErrorKind, OracleError, Result};
/// Protocol engine; construct with `ProtocolEngine::handshake`.
pub use crate::ipc::ProtocolEngine;
/// Session driver; construct with `Oracle::connect`.
pub use crate::sim::{GuestExecutor, Oracle};
/// Reference machine; construct with `Machine::new`.
pub use crate::soc::Machine;
