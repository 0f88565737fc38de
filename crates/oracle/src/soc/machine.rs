//! Reference machine: guest memory plus the three inspectable caches.
//!
//! `Machine` is the `Platform` the oracle hands to the protocol engine when no external
//! simulator supplies one. The CPU model that executes the injected code is attached
//! separately through `GuestExecutor` and works on the same machine between traces.

use std::fmt;

use crate::cache::CacheSim;
use crate::common::constants::{MAX_CODE_SIZE, MAX_REGISTERS_SIZE, MAX_SANDBOX_SIZE};
use crate::common::{OracleError, Result};
use crate::config::Config;
use crate::sim::symbols::RegionLayout;
use crate::soc::memory::GuestMemory;
use crate::soc::traits::{AddressTranslator, CacheInspectable, CacheLevel, LogReset, Platform};

/// Simulated memory and cache hierarchy of one guest process.
pub struct Machine {
    /// Guest process memory.
    pub memory: GuestMemory,
    /// L1 data cache.
    pub l1_d: CacheSim,
    /// L1 instruction cache.
    pub l1_i: CacheSim,
    /// Unified L2 cache.
    pub l2: CacheSim,
    log: Option<Box<dyn LogReset>>,
}

impl Machine {
    /// Builds the memory and caches described by `config`.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            memory: GuestMemory::new(config.memory.ram_size)?,
            l1_d: CacheSim::new(&config.cache.l1_d),
            l1_i: CacheSim::new(&config.cache.l1_i),
            l2: CacheSim::new(&config.cache.l2),
            log: None,
        })
    }

    /// Attaches the diagnostic log that RESET_LOG truncates.
    #[must_use]
    pub fn with_log(mut self, log: Box<dyn LogReset>) -> Self {
        self.set_log(log);
        self
    }

    /// Replaces the diagnostic log that RESET_LOG truncates.
    pub fn set_log(&mut self, log: Box<dyn LogReset>) {
        self.log = Some(log);
    }

    /// Maps the code, sandbox, and registers regions at their full extents.
    pub fn map_regions(&mut self, layout: &RegionLayout) -> Result<()> {
        self.memory.map(layout.code, MAX_CODE_SIZE)?;
        self.memory.map(layout.sandbox, MAX_SANDBOX_SIZE)?;
        self.memory.map(layout.registers, MAX_REGISTERS_SIZE)
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("memory", &self.memory)
            .field("l1_d", &self.l1_d)
            .field("l1_i", &self.l1_i)
            .field("l2", &self.l2)
            .field("log", &self.log.is_some())
            .finish()
    }
}

impl Platform for Machine {
    fn memory(&mut self) -> &mut dyn AddressTranslator {
        &mut self.memory
    }

    fn cache(&mut self, level: CacheLevel) -> &mut dyn CacheInspectable {
        match level {
            CacheLevel::L1Data => &mut self.l1_d,
            CacheLevel::L1Instruction => &mut self.l1_i,
            CacheLevel::L2 => &mut self.l2,
        }
    }

    fn reset_log(&mut self) -> Result<()> {
        match &self.log {
            Some(log) => log.reset().map_err(OracleError::ResetLog),
            None => Ok(()),
        }
    }
}
