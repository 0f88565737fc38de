//! Peer-side frame scripts.
//!
//! Frames are written in native byte order, exactly as the fuzzer sends them.

use rvsim_oracle::ipc::TraceHeader;
use rvsim_oracle::ipc::protocol::opcode;
use rvsim_oracle::ipc::input_hash;

/// Bytes the peer will send, built frame by frame.
#[derive(Debug, Clone, Default)]
pub struct PeerScript {
    bytes: Vec<u8>,
}

impl PeerScript {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one raw 64-bit word.
    pub fn word(mut self, word: u64) -> Self {
        self.bytes.extend_from_slice(&word.to_ne_bytes());
        self
    }

    /// Appends raw bytes.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// INIT.
    pub fn init(self) -> Self {
        self.word(opcode::INIT)
    }

    /// LOAD_TEST_CASE with `code`.
    pub fn load(self, code: &[u8]) -> Self {
        self.word(opcode::LOAD_TEST_CASE)
            .word(code.len() as u64)
            .raw(code)
    }

    /// TRACE_TEST_CASE with a correct hash.
    pub fn trace(self, input: &[u8], registers_start: u64) -> Self {
        self.trace_with_hash(input, registers_start, input_hash(input))
    }

    /// TRACE_TEST_CASE declaring `hash`, whatever the input.
    pub fn trace_with_hash(self, input: &[u8], registers_start: u64, hash: u64) -> Self {
        let header = TraceHeader {
            input_size: input.len() as u64,
            registers_start,
            declared_hash: hash,
        };
        self.word(opcode::TRACE_TEST_CASE)
            .raw(&header.encode())
            .raw(input)
    }

    /// RESET_LOG.
    pub fn reset_log(self) -> Self {
        self.word(opcode::RESET_LOG)
    }

    /// QUIT.
    pub fn quit(self) -> Self {
        self.word(opcode::QUIT)
    }

    /// The scripted bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Decodes a stream of bytes sent by the oracle into frames for comparison.
#[derive(Debug)]
pub struct Replies<'a> {
    bytes: &'a [u8],
}

impl<'a> Replies<'a> {
    /// Starts reading at the first byte the oracle sent.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Takes the next 64-bit word.
    pub fn word(&mut self) -> u64 {
        let (head, tail) = self.bytes.split_at(8);
        self.bytes = tail;
        u64::from_ne_bytes(head.try_into().unwrap())
    }

    /// Takes the next `len` raw bytes.
    pub fn bytes(&mut self, len: usize) -> &'a [u8] {
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        head
    }

    /// Takes an ACK_INIT frame and returns `(sandbox, code)`.
    pub fn ack_init(&mut self) -> (u64, u64) {
        assert_eq!(self.word(), opcode::ACK_INIT, "expected ACK_INIT");
        (self.word(), self.word())
    }

    /// Takes an ACK_LOAD frame.
    pub fn ack_load(&mut self) {
        assert_eq!(
            self.word(),
            opcode::ACK_LOAD_TEST_CASE,
            "expected ACK_LOAD_TEST_CASE"
        );
    }

    /// Takes a RESULT frame and returns `(hash, validity bytes)`.
    pub fn result(&mut self) -> (u64, &'a [u8]) {
        assert_eq!(
            self.word(),
            opcode::ACK_TRACE_TEST_CASE,
            "expected ACK_TRACE_TEST_CASE"
        );
        let count = self.word() as usize;
        let hash = self.word();
        (hash, self.bytes(count))
    }

    /// Returns `true` once everything has been consumed.
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
