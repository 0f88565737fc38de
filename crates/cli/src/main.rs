//! Revizor test-oracle server.
//!
//! This binary connects the oracle to a waiting fuzzer and serves it until it quits. It performs:
//! 1. **Configuration:** Loads an optional JSON config and applies command-line overrides.
//! 2. **Logging:** Installs a `tracing` subscriber writing to stderr or to a resettable debug file.
//! 3. **Session:** Resolves the guest executable, handshakes, and runs the command loop.
//!
//! This is the one place where an error ends the process: it is logged with its kind and
//! the server exits with status 1.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clap::Parser;
use tracing::{error, info, trace};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

use rvsim_oracle::soc::LogReset;
use rvsim_oracle::{Config, GuestExecutor, Machine, Oracle, OracleError};

#[derive(Parser, Debug)]
#[command(
    name = "oracle-server",
    author,
    version,
    about = "Cache side-channel test oracle for the Revizor fuzzer",
    long_about = "Connect to a fuzzer listening on an abstract Unix socket, inject its test cases and inputs into the simulated guest, and report which data-cache lines were valid after each trace.\n\nExamples:\n  oracle-server --executable build/revizor/base --socket-name revizor-0\n  oracle-server --config oracle.json --debug-file oracle.log --log debug"
)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Guest executable defining `code`, `sandbox`, and `registers` (overrides the config).
    #[arg(short, long)]
    executable: Option<PathBuf>,

    /// Abstract socket name without the leading NUL (overrides the config).
    #[arg(short, long)]
    socket_name: Option<String>,

    /// Log filter directives, e.g. `debug` or `rvsim_oracle::commands=debug`.
    #[arg(long)]
    log: Option<String>,

    /// Write the log to this file instead of stderr; RESET_LOG truncates it.
    #[arg(long)]
    debug_file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let debug_file = match cli.debug_file.as_deref().map(DebugFile::create).transpose() {
        Ok(file) => file,
        Err(err) => {
            eprintln!("couldn't create debug file: {err}");
            process::exit(1);
        }
    };
    init_logging(cli.log.as_deref(), debug_file.clone());

    if let Err(err) = serve(&cli, debug_file) {
        error!(kind = ?err.kind(), "{err}");
        process::exit(1);
    }
}

/// Builds the configuration, connects, and serves the fuzzer until it quits.
fn serve(cli: &Cli, debug_file: Option<DebugFile>) -> Result<(), OracleError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(executable) = &cli.executable {
        config.general.executable_path = Some(executable.clone());
    }
    if let Some(socket_name) = &cli.socket_name {
        config.general.socket_name = Some(socket_name.clone());
    }

    let mut oracle = Oracle::connect(&config)?;
    if let Some(file) = debug_file {
        oracle.machine_mut().set_log(Box::new(file));
    }

    let traces = oracle.run(&mut IdleExecutor)?;
    info!(traces, "session finished");
    Ok(())
}

/// Installs the global subscriber.
///
/// Directives come from `--log`, then `RUST_LOG`, then default to `info`.
fn init_logging(directives: Option<&str>, debug_file: Option<DebugFile>) {
    let filter = directives
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    match debug_file {
        Some(file) => registry()
            .with(fmt::layer().with_ansi(false).with_writer(file).with_filter(filter))
            .init(),
        None => registry()
            .with(fmt::layer().with_writer(io::stderr).with_filter(filter))
            .init(),
    }
}

/// Executor used when no CPU model is attached: the guest is never advanced.
///
/// Every trace reports the cache state left by the injection itself, which turns the
/// server into a protocol loopback for fuzzer-side development.
#[derive(Debug)]
struct IdleExecutor;

impl GuestExecutor for IdleExecutor {
    fn run_to_checkpoint(&mut self, _machine: &mut Machine) -> rvsim_oracle::Result<()> {
        trace!("no CPU model attached; guest not advanced");
        Ok(())
    }
}

/// Log file shared between the subscriber and the machine's RESET_LOG hook.
#[derive(Clone, Debug)]
struct DebugFile {
    file: Arc<Mutex<File>>,
}

impl DebugFile {
    fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogReset for DebugFile {
    fn reset(&self) -> io::Result<()> {
        let mut file = self.lock();
        file.set_len(0)?;
        let _ = file.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DebugFile {
    type Writer = DebugFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        DebugFileWriter { file: self.lock() }
    }
}

/// Holds the file lock for the duration of one formatted event.
struct DebugFileWriter<'a> {
    file: MutexGuard<'a, File>,
}

impl Write for DebugFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
