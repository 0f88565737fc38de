//! Protocol engine: the oracle side of the fuzzer session.
//!
//! The engine owns the channel and the region addresses resolved at handshake. It is driven by the
//! host simulation, which calls [`ProtocolEngine::prepare_next`] between epochs:
//!
//! ```text
//! AwaitingInit --INIT--> Ready --LOAD--> Ready
//!                          |  --RESET_LOG--> Ready
//!                          |  --TRACE--> Tracing --(host runs guest)--> prepare_next: RESULT --> Ready
//!                          \  --QUIT--> Terminated
//! ```
//!
//! Construction performs the handshake, so an engine value always starts in `Ready`.
//! Any malformed frame, integrity failure, or I/O error ends the session with an error;
//! there is no recovery path.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;

use tracing::{Level, debug, enabled, warn};

use crate::common::constants::{
    AARCH64_NOP, LOG_COMMANDS, LOG_EXEC, LOG_RESULTS, MAX_CODE_SIZE, MAX_REGISTERS_SIZE,
    MAX_SANDBOX_SIZE,
};
use crate::common::{OracleError, Result, VirtAddr};
use crate::sim::symbols::{RegionLayout, SymbolImage};
use crate::soc::traits::{AddressTranslator, CacheLevel, Platform};

use super::channel::IpcChannel;
use super::protocol::{
    Command, TraceHeader, encode_ack_init, encode_trace_result, input_hash, nop_fill, opcode,
};

/// Where the session currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for the next command.
    Ready,
    /// A trace input has been injected; its result is sent on the next `prepare_next`.
    Tracing,
    /// The peer sent QUIT.
    Terminated,
}

/// Oracle side of one fuzzer session.
#[derive(Debug)]
pub struct ProtocolEngine<S = UnixStream> {
    channel: IpcChannel<S>,
    layout: RegionLayout,
    state: EngineState,
    loaded_test_case: bool,
    input_index: u64,
    input_hash: u64,
}

impl<S: Read + Write> ProtocolEngine<S> {
    /// Waits for INIT and answers with the sandbox and code addresses.
    ///
    /// The region addresses are taken from `symbols` once; the image is not kept.
    pub fn handshake(mut channel: IpcChannel<S>, symbols: &dyn SymbolImage) -> Result<Self> {
        let layout = RegionLayout::from_image(symbols)?;

        let op = channel.recv_u64()?;
        if op != opcode::INIT {
            return Err(OracleError::MissingInit(op));
        }
        debug!(target: LOG_COMMANDS, "Got command: init");

        debug!(target: LOG_COMMANDS, "Send command: acknowledge init");
        channel.send_exact(&encode_ack_init(layout.sandbox.val(), layout.code.val()))?;

        Ok(Self {
            channel,
            layout,
            state: EngineState::Ready,
            loaded_test_case: false,
            input_index: 0,
            input_hash: 0,
        })
    }

    /// Reports the previous trace, if any, then serves commands until the next trace.
    ///
    /// Returns `true` once a TRACE input has been injected; the host must then run the
    /// guest to its next checkpoint and call `prepare_next` again. Returns `false` when
    /// the peer has quit, and keeps returning `false` without touching the channel.
    pub fn prepare_next<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Result<bool> {
        match self.state {
            EngineState::Terminated => return Ok(false),
            EngineState::Tracing => {
                if self.loaded_test_case {
                    self.analyze(platform)?;
                }
                self.state = EngineState::Ready;
            }
            EngineState::Ready => {}
        }

        loop {
            let op = self.channel.recv_u64()?;
            match Command::from_opcode(op) {
                Some(Command::Quit) => {
                    debug!(target: LOG_COMMANDS, "Got command: quit");
                    self.state = EngineState::Terminated;
                    return Ok(false);
                }
                Some(Command::LoadTestCase) => self.load_test_case(platform)?,
                Some(Command::TraceTestCase) => {
                    self.trace_test_case(platform)?;
                    self.state = EngineState::Tracing;
                    return Ok(true);
                }
                Some(Command::ResetLog) => {
                    debug!(target: LOG_COMMANDS, "Got command: reset log");
                    platform.reset_log()?;
                }
                None => return Err(OracleError::UnknownCommand(op)),
            }
        }
    }

    fn load_test_case<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Result<()> {
        let size = self.channel.recv_u64()?;
        debug!(target: LOG_COMMANDS, "Got command: Load test case (size {size})");
        if size > MAX_CODE_SIZE {
            return Err(OracleError::TestCaseTooLarge(size));
        }

        let mut code = nop_fill(AARCH64_NOP, MAX_CODE_SIZE as usize);
        self.channel.recv_exact(&mut code[..size as usize])?;

        let memory = platform.memory();
        memory.write_bytes(self.layout.code, &code)?;
        if enabled!(target: LOG_EXEC, Level::DEBUG) {
            log_code(memory, self.layout.code, size)?;
        }

        self.loaded_test_case = true;
        debug!(target: LOG_COMMANDS, "Send command: acknowledge load test case");
        self.channel.send_u64(opcode::ACK_LOAD_TEST_CASE)
    }

    fn trace_test_case<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Result<()> {
        for level in CacheLevel::FLUSH_ORDER {
            platform.cache(level).writeback();
        }

        let mut raw = [0u8; TraceHeader::SIZE];
        self.channel.recv_exact(&mut raw)?;
        let header = TraceHeader::decode(&raw);
        debug!(
            target: LOG_COMMANDS,
            "Got command: trace test case input hash={:016x} size={} registers={}",
            header.declared_hash,
            header.input_size,
            header.registers_start,
        );
        let register_len = header.register_bytes()?;

        let input = self.channel.recv_vec(header.input_size as usize)?;
        let computed = input_hash(&input);
        if computed != header.declared_hash {
            return Err(OracleError::HashMismatch {
                declared: header.declared_hash,
                computed,
            });
        }
        if !self.loaded_test_case {
            warn!(target: LOG_COMMANDS, "tracing input before any test case was loaded");
        }
        self.input_hash = header.declared_hash;

        let (sandbox_bytes, register_bytes) = input.split_at(header.registers_start as usize);
        debug_assert_eq!(register_bytes.len() as u64, register_len);
        let memory = platform.memory();
        memory.fill(self.layout.sandbox, MAX_SANDBOX_SIZE, 0)?;
        memory.write_bytes(self.layout.sandbox, sandbox_bytes)?;
        memory.fill(self.layout.registers, MAX_REGISTERS_SIZE, 0)?;
        memory.write_bytes(self.layout.registers, register_bytes)?;

        for level in CacheLevel::FLUSH_ORDER {
            platform.cache(level).invalidate();
        }
        Ok(())
    }

    fn analyze<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Result<()> {
        let snapshot = platform.cache(CacheLevel::L1Data).snapshot();
        debug!(
            target: LOG_COMMANDS,
            "Send command: test case results for input {:016x}. size = {}",
            self.input_hash,
            snapshot.len(),
        );
        self.channel
            .send_exact(&encode_trace_result(self.input_hash, &snapshot))?;

        debug!(
            target: LOG_RESULTS,
            "---- input #{}: {:016x} ----", self.input_index, self.input_hash
        );
        self.input_index += 1;
        platform.cache(CacheLevel::L1Data).log_valid_lines();
        Ok(())
    }

    /// Current protocol state.
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Whether a test case has been loaded in this session.
    pub const fn loaded_test_case(&self) -> bool {
        self.loaded_test_case
    }

    /// Number of traces reported to the peer so far.
    pub const fn input_index(&self) -> u64 {
        self.input_index
    }

    /// Hash of the most recent trace input.
    pub const fn input_hash(&self) -> u64 {
        self.input_hash
    }

    /// Addresses of the injected regions.
    pub const fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    /// The channel to the peer.
    pub const fn channel(&self) -> &IpcChannel<S> {
        &self.channel
    }

    /// Ends the session, returning the channel.
    pub fn into_channel(self) -> IpcChannel<S> {
        self.channel
    }
}

/// Logs the injected code, eight bytes per line, as read back from guest memory.
fn log_code(memory: &mut dyn AddressTranslator, code: VirtAddr, size: u64) -> Result<()> {
    debug!(target: LOG_EXEC, "--- Code ---");
    for line_start in (0..size).step_by(8) {
        let mut line = format!("{:x}", code.val() + line_start);
        for offset in line_start..(line_start + 8).min(size) {
            let byte = memory.read_byte(VirtAddr::new(code.val() + offset))?;
            line.push_str(&format!(" {byte:02x}"));
        }
        debug!(target: LOG_EXEC, "{line}");
    }
    Ok(())
}
