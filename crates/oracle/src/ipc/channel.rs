//! Exact-length framed I/O over the peer connection.
//!
//! The channel has exactly one trusted peer and no notion of partial success: every
//! transfer either moves the full buffer or fails. There are no timeouts, and only
//! transfers interrupted by a signal are retried.

use std::io::{self, Read, Write};
use std::mem;
use std::os::unix::net::UnixStream;

use crate::common::{OracleError, Result};

use super::protocol::WORD;

/// Bytes available for a socket name after the leading NUL of an abstract address.
pub const MAX_SOCKET_NAME: usize =
    mem::size_of::<libc::sockaddr_un>() - mem::size_of::<libc::sa_family_t>() - 1;

/// Blocking byte channel to the peer.
#[derive(Debug)]
pub struct IpcChannel<S = UnixStream> {
    stream: S,
}

impl IpcChannel<UnixStream> {
    /// Connects to the abstract-namespace stream socket `name`.
    ///
    /// `name` excludes the leading NUL byte that marks the address as abstract.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn connect(name: &str) -> Result<Self> {
        #[cfg(target_os = "android")]
        use std::os::android::net::SocketAddrExt;
        #[cfg(target_os = "linux")]
        use std::os::linux::net::SocketAddrExt;
        use std::os::unix::net::SocketAddr;

        if name.len() > MAX_SOCKET_NAME {
            return Err(OracleError::SocketNameTooLong {
                len: name.len(),
                max: MAX_SOCKET_NAME,
            });
        }
        let addr = SocketAddr::from_abstract_name(name.as_bytes()).map_err(OracleError::Connect)?;
        let stream = UnixStream::connect_addr(&addr).map_err(OracleError::Connect)?;
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> IpcChannel<S> {
    /// Wraps an already connected stream.
    pub const fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Fills `buf` completely from the peer.
    ///
    /// End of stream before `buf` is full means the peer went away. Interrupted reads are
    /// retried.
    pub fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut received = 0;
        while received < buf.len() {
            match self.stream.read(&mut buf[received..]) {
                Ok(0) => {
                    return Err(OracleError::PeerClosed {
                        received,
                        expected: buf.len(),
                    });
                }
                Ok(count) => received += count,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(OracleError::Read(err)),
            }
        }
        Ok(())
    }

    /// Receives exactly `len` bytes.
    pub fn recv_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.recv_exact(&mut buf)?;
        Ok(buf)
    }

    /// Receives one 64-bit word.
    pub fn recv_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; WORD];
        self.recv_exact(&mut buf)?;
        Ok(u64::from_ne_bytes(buf))
    }

    /// Sends all of `buf` to the peer.
    pub fn send_exact(&mut self, buf: &[u8]) -> Result<()> {
        let mut sent = 0;
        while sent < buf.len() {
            match self.stream.write(&buf[sent..]) {
                Ok(0) => return Err(OracleError::Write(io::ErrorKind::WriteZero.into())),
                Ok(count) => sent += count,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(OracleError::Write(err)),
            }
        }
        self.stream.flush().map_err(OracleError::Write)
    }

    /// Sends one 64-bit word.
    pub fn send_u64(&mut self, word: u64) -> Result<()> {
        self.send_exact(&word.to_ne_bytes())
    }

    /// The underlying stream.
    pub const fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Consumes the channel, returning the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}
