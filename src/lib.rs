//! # arenalloc - A Free-List Allocator over a Caller-Owned Arena
//!
//! This crate serves `malloc`/`free` style requests out of a single fixed-size
//! memory region handed over by the caller. It never calls into the system
//! allocator: every piece of bookkeeping lives inside the region itself.
//!
//! ## Overview
//!
//! ```text
//!   Arena Layout:
//!
//!   ┌──────────────┬────────┬─────────┬────────┬─────────┬────────┬──────────────┐
//!   │ ArenaHeader  │ Header │ payload │ Header │ payload │ Header │   payload    │
//!   │ total_size   │  used  │         │  free  │         │  used  │              │
//!   │ fit policy   │        │         │   │    │         │        │              │
//!   │ free list ───┼────────┼─────────┼─► │    │         │        │              │
//!   └──────────────┴────────┴─────────┴───┼────┴─────────┴────────┴──────────────┘
//!                                          └──► next free block (ascending address)
//!
//!   Blocks tile the arena with no gaps. Free blocks are chained in address
//!   order; a block is free iff the chain reaches it.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   arenalloc
//!   ├── align   - Alignment boundary and the align! macro
//!   ├── block   - In-band block header and its offset accessors (internal)
//!   ├── fit     - FitPolicy trait with first, best and worst fit
//!   ├── arena   - Arena: init, alloc, free, realloc, inspection
//!   ├── stats   - Occupancy summary
//!   ├── config  - ArenaConfig (serde, environment)
//!   ├── region  - MappedRegion, an mmap-backed home for an arena (unix)
//!   ├── sync    - LockedArena, one coarse lock around every operation
//!   └── error   - ArenaError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use arenalloc::{Arena, BEST_FIT};
//!
//! #[repr(C, align(16))]
//! struct Backing([u8; 1024]);
//!
//! let mut backing = Backing([0; 1024]);
//! let mut arena = Arena::from_slice(&mut backing.0).unwrap();
//!
//! let a = arena.alloc(100).unwrap();
//! assert_eq!(unsafe { arena.get_allocated_size(a) }, 112);
//!
//! arena.set_fit_policy(&BEST_FIT);
//! unsafe { arena.free(a) };
//!
//! assert_eq!(arena.blocks().count(), 1);
//! assert!(arena.alloc(2000).is_none());
//! ```
//!
//! ## How It Works
//!
//! Allocation rounds the request up to [`ALIGNMENT`] and asks the active
//! [`FitPolicy`] for a free block. A block larger than the request plus a header
//! is split and the remainder takes its place on the free list; an exact fit is
//! unlinked whole. Release puts the block back in address order and merges it with
//! a free neighbour on either side, so two free blocks are never adjacent.
//!
//! ## Limitations
//!
//! - **Single-threaded core**: wrap it in [`LockedArena`] for shared use
//! - **No validation**: foreign pointers and double frees are undefined behaviour
//! - **Fixed size**: the arena never grows
//! - **Linear operations**: free, `is_free` and every policy walk the free list
//!
//! ## Safety
//!
//! Releasing and size queries trust the pointer they are given, so they are
//! `unsafe`. Allocation and inspection are safe as long as no earlier `unsafe`
//! call broke the arena.

pub mod align;
mod arena;
mod block;
mod config;
mod error;
mod fit;
#[cfg(unix)]
mod region;
mod stats;
mod sync;

pub use arena::{ARENA_HEADER_SIZE, Arena, BlockInfo, Blocks, MIN_ARENA_SIZE};
pub use align::{ALIGNMENT, align_up};
pub use block::{HEADER_SIZE, is_eligible};
pub use config::{ArenaConfig, DEFAULT_ARENA_SIZE, FIT_POLICY_VAR, SIZE_VAR};
pub use error::{ArenaError, Result};
pub use fit::{
  BEST_FIT, BestFit, FIRST_FIT, FirstFit, FitPolicy, FitPolicyKind, FreeBlock, FreeBlocks,
  WORST_FIT, WorstFit,
};
#[cfg(unix)]
pub use region::MappedRegion;
pub use stats::ArenaStats;
pub use sync::LockedArena;
