use std::ptr::{self, NonNull};

use arenalloc::{ArenaConfig, BEST_FIT, FIRST_FIT, MappedRegion, WORST_FIT};

/// Prints one block the way a heap map reads: offset from the arena start, size and
/// state.
fn print_block(
  start: NonNull<u8>,
  address: NonNull<u8>,
  usable_size: usize,
  is_free: bool,
) {
  println!(
    "  {:>6}  {:>6} bytes  {}",
    address.as_ptr() as usize - start.as_ptr() as usize,
    usable_size,
    if is_free { "free" } else { "used" }
  );
}

fn main() -> arenalloc::Result<()> {
  env_logger::init();

  // ARENALLOC_SIZE and ARENALLOC_FIT_POLICY override the defaults.
  let config = ArenaConfig::from_env()?;
  let mut region = MappedRegion::from_config(&config)?;
  let mut arena = region.arena_with(&config)?;
  let start = arena.start();

  println!(
    "arena of {} bytes, {}-fit",
    arena.total_size(),
    arena.fit_policy().name()
  );

  macro_rules! show {
    ($label:expr) => {
      println!("\n{}", $label);
      arena.show(|address, size, free| print_block(start, address, size, free));
    };
  }

  show!("[0] Fresh arena");

  // --------------------------------------------------------------------
  // 1) Three allocations carve the single free block from the front.
  // --------------------------------------------------------------------
  let a = arena.alloc(100).expect("arena too small for the demo");
  let b = arena.alloc(40).expect("arena too small for the demo");
  let c = arena.alloc(300).expect("arena too small for the demo");
  unsafe {
    ptr::write_bytes(a.as_ptr(), 0xAA, arena.get_allocated_size(a));
    ptr::write_bytes(b.as_ptr(), 0xBB, arena.get_allocated_size(b));
    ptr::write_bytes(c.as_ptr(), 0xCC, arena.get_allocated_size(c));
  }
  show!("[1] After alloc(100), alloc(40), alloc(300)");

  // --------------------------------------------------------------------
  // 2) Freeing the middle block leaves a hole; no neighbour is free yet.
  // --------------------------------------------------------------------
  unsafe { arena.free(b) };
  show!("[2] After free(b)");

  // --------------------------------------------------------------------
  // 3) Freeing the first block merges it forward into the hole.
  // --------------------------------------------------------------------
  unsafe { arena.free(a) };
  show!("[3] After free(a): merged with b");

  // --------------------------------------------------------------------
  // 4) Same request under each policy: first and best take the hole, worst
  //    takes the large tail.
  // --------------------------------------------------------------------
  for policy in [&FIRST_FIT as &dyn arenalloc::FitPolicy, &BEST_FIT, &WORST_FIT] {
    arena.set_fit_policy(policy);
    let p = arena.alloc(64).expect("arena too small for the demo");
    println!(
      "\n[4] {}-fit placed alloc(64) at offset {}",
      policy.name(),
      p.as_ptr() as usize - start.as_ptr() as usize
    );
    unsafe { arena.free(p) };
  }

  // --------------------------------------------------------------------
  // 5) Growing c moves it; the old block returns to the free list.
  // --------------------------------------------------------------------
  let c = unsafe { arena.realloc(Some(c), 600) }.expect("arena too small for the demo");
  show!("[5] After realloc(c, 600)");

  // --------------------------------------------------------------------
  // 6) A request larger than the arena fails cleanly.
  // --------------------------------------------------------------------
  println!(
    "\n[6] alloc({}) -> {:?}",
    config.size * 2,
    arena.alloc(config.size * 2)
  );

  unsafe { arena.free(c) };
  show!("[7] Everything released");
  println!("\n{:#?}", arena.stats());

  Ok(())
}
