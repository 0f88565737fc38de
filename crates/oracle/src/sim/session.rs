//! Session driver.
//!
//! Wires a resolved executable, the reference machine, and a connected protocol engine
//! into one session, then alternates between serving the peer and running the guest.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;

use tracing::info;

use crate::common::Result;
use crate::config::Config;
use crate::ipc::{IpcChannel, ProtocolEngine};
use crate::sim::symbols::{self, RegionLayout};
use crate::soc::Machine;

/// The CPU model that runs the injected code between traces.
pub trait GuestExecutor {
    /// Runs the guest on `machine` until its next checkpoint (halt, trap, or exit).
    fn run_to_checkpoint(&mut self, machine: &mut Machine) -> Result<()>;
}

/// One oracle session: the engine plus the machine it injects into.
#[derive(Debug)]
pub struct Oracle<S = UnixStream> {
    engine: ProtocolEngine<S>,
    machine: Machine,
}

impl Oracle {
    /// Resolves the executable, builds and maps the machine, connects, and handshakes.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn connect(config: &Config) -> Result<Self> {
        let executable = config.executable_path()?;
        let socket_name = config.socket_name()?;

        let symbols = symbols::resolve(executable)?;
        let mut machine = Machine::new(config)?;
        let layout = RegionLayout::from_image(&symbols)?;
        machine.map_regions(&layout)?;

        let channel = IpcChannel::connect(socket_name)?;
        info!(socket = socket_name, "connected to fuzzer");
        let engine = ProtocolEngine::handshake(channel, &symbols)?;
        Ok(Self::new(engine, machine))
    }
}

impl<S: Read + Write> Oracle<S> {
    /// Assembles a session from an engine that has already completed its handshake.
    pub const fn new(engine: ProtocolEngine<S>, machine: Machine) -> Self {
        Self { engine, machine }
    }

    /// Serves the peer until it quits, running the guest after every trace.
    ///
    /// Returns the number of traces reported.
    pub fn run<E: GuestExecutor + ?Sized>(&mut self, executor: &mut E) -> Result<u64> {
        while self.engine.prepare_next(&mut self.machine)? {
            executor.run_to_checkpoint(&mut self.machine)?;
        }
        info!(traces = self.engine.input_index(), "fuzzer quit");
        Ok(self.engine.input_index())
    }

    /// The protocol engine.
    pub const fn engine(&self) -> &ProtocolEngine<S> {
        &self.engine
    }

    /// The machine the guest runs on.
    pub const fn machine(&self) -> &Machine {
        &self.machine
    }

    /// The machine the guest runs on, mutably.
    pub const fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }
}
