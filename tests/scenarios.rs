use std::ptr::NonNull;

use arenalloc::{ARENA_HEADER_SIZE, Arena, BEST_FIT, HEADER_SIZE, MIN_ARENA_SIZE, WORST_FIT};

#[repr(C, align(16))]
struct Backing([u8; 1024]);

impl Backing {
  fn new() -> Self {
    Self([0; 1024])
  }
}

fn snapshot(arena: &Arena<'_>) -> Vec<(NonNull<u8>, usize, bool)> {
  let mut blocks = Vec::new();
  arena.show(|address, size, free| blocks.push((address, size, free)));
  blocks
}

#[test]
fn alloc_free_restores_single_block() {
  let mut backing = Backing::new();
  let mut arena = Arena::from_slice(&mut backing.0).unwrap();
  let initial = snapshot(&arena);

  let a = arena.alloc(100).expect("100 bytes fit in a 1 KiB arena");
  let block = unsafe { arena.block_of(a) };
  assert!(!arena.is_free(block));

  unsafe { arena.free(a) };

  let blocks = snapshot(&arena);
  assert_eq!(blocks, initial);
  assert_eq!(blocks.len(), 1);
  assert_eq!(blocks[0].1, 1024 - MIN_ARENA_SIZE);
  assert!(blocks[0].2);
  assert!(arena.is_free(block));

  assert!(arena.alloc(2000).is_none());
}

#[test]
fn split_then_merge_both_ways() {
  let mut backing = Backing::new();
  let mut arena = Arena::from_slice(&mut backing.0).unwrap();
  let initial = snapshot(&arena);

  let a = arena.alloc(64).unwrap();
  let b = arena.alloc(64).unwrap();
  assert_eq!(
    b.as_ptr() as usize - a.as_ptr() as usize,
    64 + HEADER_SIZE
  );

  unsafe {
    arena.free(a);
    arena.free(b);
  }

  assert_eq!(snapshot(&arena), initial);
}

#[test]
fn independent_arenas_do_not_interfere() {
  let mut left = Backing::new();
  let mut right = Backing::new();
  let mut first = Arena::from_slice(&mut left.0).unwrap();
  let mut second = Arena::from_slice(&mut right.0).unwrap();
  second.set_fit_policy(&WORST_FIT);

  let a = first.alloc(500).unwrap();
  let b = second.alloc(500).unwrap();
  assert!(first.alloc(500).is_none());
  assert!(second.alloc(500).is_none());

  unsafe { first.free(a) };
  assert!(first.alloc(500).is_some());
  assert!(second.alloc(500).is_none());
  assert_eq!(first.fit_policy().name(), "first");

  unsafe { second.free(b) };
  assert_eq!(second.stats().free_blocks, 1);
}

#[test]
fn best_fit_limits_fragmentation() {
  let mut backing = Backing::new();
  let mut arena = Arena::from_slice(&mut backing.0).unwrap();
  arena.set_fit_policy(&BEST_FIT);

  let big = arena.alloc(256).unwrap();
  let _pin1 = arena.alloc(16).unwrap();
  let small = arena.alloc(32).unwrap();
  let _pin2 = arena.alloc(16).unwrap();
  unsafe {
    arena.free(big);
    arena.free(small);
  }

  // The 32-byte hole is an exact fit; the 256-byte hole survives for later.
  assert_eq!(arena.alloc(32), Some(small));
  assert_eq!(arena.alloc(256), Some(big));
}

#[test]
fn iteration_covers_arena_exactly() {
  let mut backing = Backing::new();
  let mut arena = Arena::from_slice(&mut backing.0).unwrap();

  let ptrs: Vec<_> = [10, 200, 0, 48, 90]
    .into_iter()
    .map(|n| arena.alloc(n).unwrap())
    .collect();
  unsafe {
    arena.free(ptrs[1]);
    arena.free(ptrs[3]);
  }

  let start = arena.start().as_ptr() as usize;
  let mut expected = start + ARENA_HEADER_SIZE;
  for block in arena.blocks() {
    assert_eq!(block.address.as_ptr() as usize, expected);
    expected += HEADER_SIZE + block.usable_size;
  }
  assert_eq!(expected, start + arena.total_size());
}
