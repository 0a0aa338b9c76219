//! Occupancy summary of an arena, gathered in one pass over its blocks.

use crate::{arena::Arena, block::HEADER_SIZE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
  pub free_blocks: usize,
  pub used_blocks: usize,
  /// Payload bytes on the free list, headers excluded.
  pub free_bytes: usize,
  /// Payload bytes handed out, headers excluded.
  pub used_bytes: usize,
  pub largest_free: usize,
}

impl ArenaStats {
  /// Bytes spent on block headers.
  pub fn header_bytes(&self) -> usize {
    (self.free_blocks + self.used_blocks) * HEADER_SIZE
  }
}

impl Arena<'_> {
  pub fn stats(&self) -> ArenaStats {
    self
      .blocks()
      .fold(ArenaStats::default(), |mut stats, block| {
        if block.is_free {
          stats.free_blocks += 1;
          stats.free_bytes += block.usable_size;
          stats.largest_free = stats.largest_free.max(block.usable_size);
        } else {
          stats.used_blocks += 1;
          stats.used_bytes += block.usable_size;
        }
        stats
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arena::{ARENA_HEADER_SIZE, MIN_ARENA_SIZE};

  #[repr(C, align(16))]
  struct Backing([u8; 1024]);

  #[test]
  fn test_stats_fresh_arena() {
    let mut backing = Backing([0; 1024]);
    let arena = Arena::from_slice(&mut backing.0).unwrap();

    assert_eq!(
      arena.stats(),
      ArenaStats {
        free_blocks: 1,
        used_blocks: 0,
        free_bytes: 1024 - MIN_ARENA_SIZE,
        used_bytes: 0,
        largest_free: 1024 - MIN_ARENA_SIZE,
      }
    );
  }

  #[test]
  fn test_stats_account_for_every_byte() {
    let mut backing = Backing([0; 1024]);
    let mut arena = Arena::from_slice(&mut backing.0).unwrap();

    let a = arena.alloc(100).unwrap();
    let _b = arena.alloc(30).unwrap();
    let _c = arena.alloc(200).unwrap();
    unsafe { arena.free(a) };

    let stats = arena.stats();
    assert_eq!(stats.used_blocks, 2);
    assert_eq!(stats.free_blocks, 2);
    assert_eq!(stats.used_bytes, 32 + 208);
    assert_eq!(
      stats.free_bytes + stats.used_bytes + stats.header_bytes(),
      1024 - ARENA_HEADER_SIZE
    );
    assert!(stats.largest_free > 112);
  }
}
