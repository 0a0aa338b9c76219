//! Shared access to one arena behind a single lock.
//!
//! Splits and merges touch arbitrary parts of the free list, so every operation
//! takes the whole arena.

use std::ptr::NonNull;

use parking_lot::Mutex;

use crate::{
  arena::{Arena, BlockInfo},
  fit::FitPolicy,
  stats::ArenaStats,
};

pub struct LockedArena<'a> {
  inner: Mutex<Arena<'a>>,
}

impl<'a> LockedArena<'a> {
  pub fn new(arena: Arena<'a>) -> Self {
    Self {
      inner: Mutex::new(arena),
    }
  }

  pub fn into_inner(self) -> Arena<'a> {
    self.inner.into_inner()
  }

  pub fn set_fit_policy(
    &self,
    policy: &'static dyn FitPolicy,
  ) {
    self.inner.lock().set_fit_policy(policy);
  }

  pub fn alloc(
    &self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    self.inner.lock().alloc(size)
  }

  pub fn zalloc(
    &self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    self.inner.lock().zalloc(size)
  }

  pub fn calloc(
    &self,
    count: usize,
    size: usize,
  ) -> Option<NonNull<u8>> {
    self.inner.lock().calloc(count, size)
  }

  /// # Safety
  ///
  /// See [`Arena::free`].
  pub unsafe fn free(
    &self,
    payload: NonNull<u8>,
  ) {
    unsafe { self.inner.lock().free(payload) }
  }

  /// # Safety
  ///
  /// See [`Arena::realloc`].
  pub unsafe fn realloc(
    &self,
    payload: Option<NonNull<u8>>,
    new_size: usize,
  ) -> Option<NonNull<u8>> {
    unsafe { self.inner.lock().realloc(payload, new_size) }
  }

  /// # Safety
  ///
  /// See [`Arena::get_allocated_size`].
  pub unsafe fn get_allocated_size(
    &self,
    payload: NonNull<u8>,
  ) -> usize {
    unsafe { self.inner.lock().get_allocated_size(payload) }
  }

  pub fn is_free(
    &self,
    block: NonNull<u8>,
  ) -> bool {
    self.inner.lock().is_free(block)
  }

  /// Runs `callback` over every block while holding the lock.
  pub fn show(
    &self,
    callback: impl FnMut(NonNull<u8>, usize, bool),
  ) {
    self.inner.lock().show(callback);
  }

  /// Snapshot of every block, taken under the lock.
  pub fn blocks(&self) -> Vec<BlockInfo> {
    self.inner.lock().blocks().collect()
  }

  pub fn stats(&self) -> ArenaStats {
    self.inner.lock().stats()
  }
}

#[cfg(all(test, unix))]
mod tests {
  use std::thread;

  use super::*;
  use crate::{arena::MIN_ARENA_SIZE, fit::BEST_FIT, region::MappedRegion};

  #[test]
  fn test_concurrent_alloc_free() {
    let mut region = MappedRegion::new(64 * 1024).unwrap();
    let arena = LockedArena::new(region.arena().unwrap());

    thread::scope(|scope| {
      for t in 0..4 {
        let arena = &arena;
        scope.spawn(move || {
          for i in 0..200 {
            let size = 8 + (t * 31 + i * 7) % 200;
            let payload = arena.alloc(size).expect("arena has room for every thread");
            unsafe {
              payload.as_ptr().write(t as u8);
              assert!(arena.get_allocated_size(payload) >= size);
              assert_eq!(payload.as_ptr().read(), t as u8);
              arena.free(payload);
            }
          }
        });
      }
    });

    let stats = arena.stats();
    assert_eq!(stats.used_blocks, 0);
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.free_bytes, 64 * 1024 - MIN_ARENA_SIZE);
  }

  #[test]
  fn test_delegates_to_arena() {
    let mut region = MappedRegion::new(4096).unwrap();
    let arena = LockedArena::new(region.arena().unwrap());
    arena.set_fit_policy(&BEST_FIT);

    let a = arena.calloc(3, 10).unwrap();
    unsafe {
      let a = arena.realloc(Some(a), 64).unwrap();
      assert_eq!(arena.get_allocated_size(a), 64);
      assert_eq!(arena.blocks().iter().filter(|b| !b.is_free).count(), 1);
      arena.free(a);
    }

    let mut count = 0;
    arena.show(|_, _, free| {
      assert!(free);
      count += 1;
    });
    assert_eq!(count, 1);
    assert_eq!(arena.into_inner().fit_policy().name(), "best");
  }
}
