//! Wire protocol between the fuzzer and the oracle.
//!
//! Every frame is a sequence of fixed-width 64-bit fields in the native byte order of the
//! two cooperating processes, optionally followed by a byte payload:
//!
//! | Direction     | Frame     | Layout                                                   |
//! |---------------|-----------|----------------------------------------------------------|
//! | peer → oracle | INIT      | opcode                                                   |
//! | oracle → peer | ACK_INIT  | opcode, sandbox address, code address                    |
//! | peer → oracle | LOAD      | opcode, size, `size` code bytes                          |
//! | oracle → peer | ACK_LOAD  | opcode                                                   |
//! | peer → oracle | TRACE     | opcode, input size, registers start, hash, input bytes   |
//! | oracle → peer | RESULT    | opcode, line count, hash, one 0/1 byte per cache line    |
//! | peer → oracle | RESET_LOG | opcode                                                   |
//! | peer → oracle | QUIT      | opcode                                                   |
//!
//! Opcodes are arbitrary 64-bit magic values; a mismatch means the two sides are out of sync.

use crate::cache::CacheSnapshot;
use crate::common::constants::{MAX_REGISTERS_SIZE, MAX_SANDBOX_SIZE};
use crate::common::{OracleError, Result};

/// Size of every fixed-width field.
pub const WORD: usize = 8;

/// Opcode magic values.
pub mod opcode {
    /// Peer opens the session.
    pub const INIT: u64 = 0xd09e95bc2c73ad66;
    /// Oracle acknowledges INIT with the region addresses.
    pub const ACK_INIT: u64 = 0xc4f991d25774a0ac;
    /// Peer sends a test case.
    pub const LOAD_TEST_CASE: u64 = 0xf06e27858611c27a;
    /// Oracle acknowledges a loaded test case.
    pub const ACK_LOAD_TEST_CASE: u64 = 0x847431e37076fb26;
    /// Peer sends an input to trace.
    pub const TRACE_TEST_CASE: u64 = 0x09ca711a73355bea;
    /// Oracle reports the cache state after a trace.
    pub const ACK_TRACE_TEST_CASE: u64 = 0xc1f8bc29862ef946;
    /// Peer asks for the diagnostic log to be reset.
    pub const RESET_LOG: u64 = 0x7e310c4276780c9b;
    /// Peer ends the session.
    pub const QUIT: u64 = 0x8492384098c80892;
}

/// A command received from the peer in the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// LOAD_TEST_CASE
    LoadTestCase,
    /// TRACE_TEST_CASE
    TraceTestCase,
    /// RESET_LOG
    ResetLog,
    /// QUIT
    Quit,
}

impl Command {
    /// Decodes a command opcode, or `None` for anything the main loop does not accept.
    pub const fn from_opcode(op: u64) -> Option<Self> {
        match op {
            opcode::LOAD_TEST_CASE => Some(Self::LoadTestCase),
            opcode::TRACE_TEST_CASE => Some(Self::TraceTestCase),
            opcode::RESET_LOG => Some(Self::ResetLog),
            opcode::QUIT => Some(Self::Quit),
            _ => None,
        }
    }

    /// The opcode that introduces this command.
    pub const fn opcode(self) -> u64 {
        match self {
            Self::LoadTestCase => opcode::LOAD_TEST_CASE,
            Self::TraceTestCase => opcode::TRACE_TEST_CASE,
            Self::ResetLog => opcode::RESET_LOG,
            Self::Quit => opcode::QUIT,
        }
    }
}

/// Metadata words of a TRACE frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceHeader {
    /// Number of input bytes that follow.
    pub input_size: u64,
    /// Offset of the first register byte within the input.
    pub registers_start: u64,
    /// Hash the peer computed over the input.
    pub declared_hash: u64,
}

impl TraceHeader {
    /// Size of the encoded metadata.
    pub const SIZE: usize = 3 * WORD;

    /// Decodes the three metadata words.
    pub fn decode(bytes: &[u8; Self::SIZE]) -> Self {
        let [input_size, registers_start, declared_hash] = decode_words(bytes);
        Self {
            input_size,
            registers_start,
            declared_hash,
        }
    }

    /// Encodes the three metadata words.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        encode_words([self.input_size, self.registers_start, self.declared_hash])
    }

    /// Checks the region bounds and returns the number of register bytes.
    ///
    /// The registers boundary must lie within the sandbox, the input must extend to it,
    /// and whatever follows it must fit into the registers region.
    pub fn register_bytes(&self) -> Result<u64> {
        if self.registers_start > MAX_SANDBOX_SIZE {
            return Err(OracleError::RegistersStartOutOfRange(self.registers_start));
        }
        let Some(register_bytes) = self.input_size.checked_sub(self.registers_start) else {
            return Err(OracleError::InputBeforeRegisters {
                input_size: self.input_size,
                registers_start: self.registers_start,
            });
        };
        if register_bytes > MAX_REGISTERS_SIZE {
            return Err(OracleError::RegistersTooLarge(register_bytes));
        }
        Ok(register_bytes)
    }
}

/// Initial value of the input hash.
const HASH_SEED: u64 = 0xbb7524eafb93804b;

/// Multiplier applied after each input byte.
const HASH_MULTIPLIER: u64 = 0x21f782547ea34f3d;

/// Hash the peer attaches to every TRACE input.
///
/// Starting from a fixed seed, each byte is added and the sum multiplied by a fixed odd
/// constant, all modulo 2^64.
pub fn input_hash(input: &[u8]) -> u64 {
    input.iter().fold(HASH_SEED, |hash, &byte| {
        hash.wrapping_add(u64::from(byte))
            .wrapping_mul(HASH_MULTIPLIER)
    })
}

/// Encodes a frame made only of 64-bit words.
pub fn encode_words<const N: usize, const B: usize>(words: [u64; N]) -> [u8; B] {
    let mut bytes = [0u8; B];
    for (chunk, word) in bytes.chunks_exact_mut(WORD).zip(words) {
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    bytes
}

/// Decodes a frame made only of 64-bit words.
pub fn decode_words<const B: usize, const N: usize>(bytes: &[u8; B]) -> [u64; N] {
    let mut words = [0u64; N];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(WORD)) {
        let mut raw = [0u8; WORD];
        raw.copy_from_slice(chunk);
        *word = u64::from_ne_bytes(raw);
    }
    words
}

/// Encodes the ACK_INIT frame.
pub fn encode_ack_init(sandbox: u64, code: u64) -> [u8; 3 * WORD] {
    encode_words([opcode::ACK_INIT, sandbox, code])
}

/// Encodes the RESULT frame for a completed trace.
pub fn encode_trace_result(input_hash: u64, snapshot: &CacheSnapshot) -> Vec<u8> {
    let mut frame = Vec::with_capacity(3 * WORD + snapshot.len());
    let header: [u8; 3 * WORD] = encode_words([
        opcode::ACK_TRACE_TEST_CASE,
        snapshot.len() as u64,
        input_hash,
    ]);
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&snapshot.to_wire_bytes());
    frame
}

/// Fills `len` bytes with the repeating little-endian encoding of `instruction`.
///
/// Lengths that are not a multiple of four end with a truncated instruction.
pub fn nop_fill(instruction: u32, len: usize) -> Vec<u8> {
    instruction
        .to_le_bytes()
        .into_iter()
        .cycle()
        .take(len)
        .collect()
}
