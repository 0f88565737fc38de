//! Harness error definitions.
//!
//! Every failure the oracle can hit is a variant of [`OracleError`]. The library never
//! aborts on its own; errors propagate to the process boundary, which decides to exit.
//! This keeps the fail-fast policy of the harness while leaving the core testable.
//! It provides:
//! 1. **Error Variants:** One per failure site, each carrying the context needed to diagnose it.
//! 2. **Classification:** [`ErrorKind`] groups variants into the taxonomies reported at exit.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of an [`OracleError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The executable image is not a readable 64-bit little-endian ELF file.
    Format,
    /// The environment or guest image does not satisfy the harness's requirements.
    Configuration,
    /// The peer sent a frame that violates the protocol.
    Protocol,
    /// A frame's payload failed its integrity check.
    Integrity,
    /// A transport-level failure on the channel or the host.
    Io,
}

/// Errors raised by the oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The executable could not be read from disk.
    #[error("couldn't open executable {}: {source}", path.display())]
    OpenExecutable {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The identification bytes are not those of a 64-bit little-endian ELF.
    #[error("{} is not a 64-bit little endian ELF executable", path.display())]
    NotElf64 {
        /// Path of the offending image.
        path: PathBuf,
    },

    /// A header, table, or string lies outside the image.
    #[error("{}: malformed ELF image: {what}", path.display())]
    MalformedElf {
        /// Path of the offending image.
        path: PathBuf,
        /// The structure that could not be read.
        what: &'static str,
    },

    /// The symbol table's entry size does not match the ELF64 symbol layout.
    #[error("{}: symbol entry size is {found} bytes, expected {expected}", path.display())]
    SymbolEntrySize {
        /// Path of the offending image.
        path: PathBuf,
        /// Entry size recorded in the section header.
        found: u64,
        /// Size of an ELF64 symbol entry.
        expected: u64,
    },

    /// A symbol the harness injects into is not defined by the image.
    #[error("executable does not define symbol `{name}`")]
    MissingSymbol {
        /// Name of the absent symbol.
        name: String,
    },

    /// The configuration file could not be read.
    #[error("couldn't read config {}: {source}", path.display())]
    ReadConfig {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration could not be parsed.
    #[error("invalid config: {0}")]
    ParseConfig(#[from] serde_json::Error),

    /// A required configuration value was not supplied.
    #[error("missing config value `{0}`")]
    MissingConfig(&'static str),

    /// The socket name does not fit into the socket address.
    #[error("socket name is too long: {len} bytes, at most {max} allowed")]
    SocketNameTooLong {
        /// Length of the supplied name.
        len: usize,
        /// Largest name that fits after the leading NUL byte.
        max: usize,
    },

    /// Connecting to the peer failed.
    #[error("couldn't connect to server: {0}")]
    Connect(#[source] io::Error),

    /// The peer closed the channel before a frame was complete.
    #[error("unexpected EOF from client ({received} of {expected} bytes received)")]
    PeerClosed {
        /// Bytes of the frame received before the closure.
        received: usize,
        /// Bytes the frame required.
        expected: usize,
    },

    /// Reading from the channel failed.
    #[error("error reading from client: {0}")]
    Read(#[source] io::Error),

    /// Writing to the channel failed.
    #[error("error writing to client: {0}")]
    Write(#[source] io::Error),

    /// The first frame of the session was not INIT.
    #[error("client didn't send init operation: got {0:#x}")]
    MissingInit(u64),

    /// A LOAD frame announced more code than the code region holds.
    #[error("test case is too large: {0} bytes")]
    TestCaseTooLarge(u64),

    /// A TRACE frame placed the registers boundary past the sandbox.
    #[error("registers start {0} is outside the sandbox")]
    RegistersStartOutOfRange(u64),

    /// A TRACE frame's input ends before its registers boundary.
    #[error("input of {input_size} bytes ends before registers start {registers_start}")]
    InputBeforeRegisters {
        /// Announced input size.
        input_size: u64,
        /// Announced registers boundary.
        registers_start: u64,
    },

    /// A TRACE frame carried more register bytes than the registers region holds.
    #[error("register state is too large: {0} bytes")]
    RegistersTooLarge(u64),

    /// A TRACE payload does not hash to the declared value.
    #[error("input hash mismatch: declared {declared:#018x}, computed {computed:#018x}")]
    HashMismatch {
        /// Hash sent by the peer.
        declared: u64,
        /// Hash of the bytes actually received.
        computed: u64,
    },

    /// The peer sent an opcode the engine does not know.
    #[error("unrecognized command from client: {0:#x}")]
    UnknownCommand(u64),

    /// A guest virtual address has no page table mapping.
    #[error("guest address {0:#x} is not mapped")]
    Unmapped(u64),

    /// A physical address lies beyond simulated DRAM.
    #[error("physical address {0:#x} is outside DRAM")]
    OutsideDram(u64),

    /// Simulated DRAM ran out of free frames.
    #[error("out of guest memory mapping {0:#x}")]
    OutOfFrames(u64),

    /// The host could not allocate simulated DRAM.
    #[error("couldn't allocate {size} bytes of DRAM: {source}")]
    Allocation {
        /// Requested size in bytes.
        size: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The diagnostic log could not be reset.
    #[error("couldn't reset debug log: {0}")]
    ResetLog(#[source] io::Error),
}

impl OracleError {
    /// Returns the taxonomy this error belongs to.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotElf64 { .. } | Self::MalformedElf { .. } | Self::SymbolEntrySize { .. } => {
                ErrorKind::Format
            }
            Self::MissingSymbol { .. }
            | Self::ParseConfig(_)
            | Self::MissingConfig(_)
            | Self::SocketNameTooLong { .. }
            | Self::Unmapped(_)
            | Self::OutsideDram(_)
            | Self::OutOfFrames(_) => ErrorKind::Configuration,
            Self::MissingInit(_)
            | Self::TestCaseTooLarge(_)
            | Self::RegistersStartOutOfRange(_)
            | Self::InputBeforeRegisters { .. }
            | Self::RegistersTooLarge(_)
            | Self::UnknownCommand(_) => ErrorKind::Protocol,
            Self::HashMismatch { .. } => ErrorKind::Integrity,
            Self::OpenExecutable { .. }
            | Self::ReadConfig { .. }
            | Self::Connect(_)
            | Self::PeerClosed { .. }
            | Self::Read(_)
            | Self::Write(_)
            | Self::Allocation { .. }
            | Self::ResetLog(_) => ErrorKind::Io,
        }
    }
}

/// Result type used throughout the oracle.
pub type Result<T> = std::result::Result<T, OracleError>;
