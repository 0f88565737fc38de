//! Fuzzer IPC.
//!
//! This module implements the oracle's side of the connection to the test-case generator.
//! It provides:
//! 1. **Channel:** Exact-length blocking transfers over an abstract Unix stream socket.
//! 2. **Protocol:** Opcodes, frame layouts, and the input hash.
//! 3. **Engine:** The handshake and command loop that injects test cases and reports
//!    cache state.

/// Exact-length framed transport.
pub mod channel;

/// Protocol state machine.
pub mod engine;

/// Wire format.
pub mod protocol;

pub use self::channel::IpcChannel;
pub use self::engine::{EngineState, ProtocolEngine};
pub use self::protocol::{Command, TraceHeader, input_hash};
