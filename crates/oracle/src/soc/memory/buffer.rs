//! DRAM Buffer Implementation.
//!
//! This module provides a safe wrapper around the host allocation backing simulated DRAM.
//! It allocates with `mmap`, so pages are only committed by the OS when the guest
//! (or the oracle) first touches them. A 512 MiB machine therefore costs a few pages of
//! host memory per session.

use std::io;
use std::slice;

use crate::common::{OracleError, Result};

/// Host memory standing in for simulated DRAM.
#[derive(Debug)]
pub struct DramBuffer {
    ptr: *mut u8,
    size: usize,
}

// SAFETY: the buffer is uniquely owned and only reached through `&self`/`&mut self`.
unsafe impl Send for DramBuffer {}

impl DramBuffer {
    /// Allocates a zeroed buffer of `size` bytes.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Ok(Self {
                ptr: std::ptr::NonNull::dangling().as_ptr(),
                size,
            });
        }
        // SAFETY: anonymous private mapping with no address hint; the result is checked below.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(OracleError::Allocation {
                size,
                source: io::Error::last_os_error(),
            });
        }

        Ok(Self {
            ptr: ptr.cast::<u8>(),
            size,
        })
    }

    /// Returns the size of the buffer in bytes.
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` for a zero-sized buffer.
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Views the whole buffer.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` is valid for `size` initialized bytes for the lifetime of `self`.
        unsafe { slice::from_raw_parts(self.ptr, self.size) }
    }

    /// Views the whole buffer mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.ptr, self.size) }
    }

    /// Returns the host byte at `offset`, or `None` past the end.
    pub fn get_mut(&mut self, offset: usize) -> Option<&mut u8> {
        self.as_mut_slice().get_mut(offset)
    }
}

impl Drop for DramBuffer {
    fn drop(&mut self) {
        if self.size == 0 {
            return;
        }
        // SAFETY: `ptr`/`size` are exactly what `mmap` returned.
        unsafe {
            let _ = libc::munmap(self.ptr.cast::<libc::c_void>(), self.size);
        }
    }
}
