//! Anonymous memory mappings to host an arena.
//!
//! The allocator core only needs a pointer and a length; this is one way for a
//! host to get them without going through the system heap.

use std::{io, ptr, ptr::NonNull, slice};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};
use log::{debug, warn};

use crate::{
  arena::Arena,
  config::ArenaConfig,
  error::{ArenaError, Result},
};

/// A private, zero-filled, page-aligned mapping, unmapped on drop.
#[derive(Debug)]
pub struct MappedRegion {
  ptr: NonNull<u8>,
  len: usize,
}

// The mapping is owned exclusively by this value.
unsafe impl Send for MappedRegion {}

impl MappedRegion {
  pub fn new(len: usize) -> Result<Self> {
    if len == 0 {
      return Err(ArenaError::InvalidConfig(
        "cannot map an empty region".to_string(),
      ));
    }

    let address = unsafe {
      mmap(
        ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(ArenaError::Map(io::Error::last_os_error()));
    }

    let ptr = NonNull::new(address as *mut u8)
      .ok_or_else(|| ArenaError::Map(io::Error::other("mmap returned null")))?;

    debug!("mapped {} bytes at {:p}", len, ptr);

    Ok(Self { ptr, len })
  }

  pub fn from_config(config: &ArenaConfig) -> Result<Self> {
    config.validate()?;
    Self::new(config.size)
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn as_mut_slice(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
  }

  /// Lays out a fresh arena over the whole mapping.
  ///
  /// Any arena previously built on this region is overwritten.
  pub fn arena(&mut self) -> Result<Arena<'_>> {
    Arena::from_slice(self.as_mut_slice())
  }

  /// Lays out a fresh arena over the whole mapping with the configured policy.
  pub fn arena_with(
    &mut self,
    config: &ArenaConfig,
  ) -> Result<Arena<'_>> {
    Arena::from_slice_with(self.as_mut_slice(), config)
  }
}

impl Drop for MappedRegion {
  fn drop(&mut self) {
    let rc = unsafe { munmap(self.ptr.as_ptr() as *mut c_void, self.len) };
    if rc != 0 {
      warn!(
        "munmap of {} bytes at {:p} failed: {}",
        self.len,
        self.ptr,
        io::Error::last_os_error()
      );
    } else {
      debug!("unmapped {} bytes at {:p}", self.len, self.ptr);
    }
  }
}
