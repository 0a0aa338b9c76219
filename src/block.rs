use std::{mem, ptr::NonNull};

use crate::align::ALIGNMENT;

/// In-band metadata placed immediately before every payload in the arena.
///
/// ```text
///   ┌──────────────────────┬──────────────────────────────┐
///   │     BlockHeader      │           payload            │
///   │  usable_size: N      │        N bytes usable        │
///   │  next_free: ptr/None │                              │
///   └──────────────────────┴──────────────────────────────┘
///   ▲                      ▲
///   block address          payload address (returned by alloc)
/// ```
///
/// `next_free` is only meaningful while the block sits on the free list. Whether a
/// block is free is never stored here: it is free iff the free list reaches it.
#[repr(C, align(16))]
pub struct BlockHeader {
  pub(crate) usable_size: usize,
  pub(crate) next_free: Option<NonNull<BlockHeader>>,
}

/// Size of one block header, a multiple of [`ALIGNMENT`].
pub const HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

const _: () = assert!(HEADER_SIZE % ALIGNMENT == 0);

// Every raw read and write of a header goes through the functions below.
impl BlockHeader {
  /// Writes a fresh header at `at`.
  ///
  /// # Safety
  ///
  /// `at` must be aligned and point to at least `HEADER_SIZE` writable bytes inside
  /// the arena.
  pub(crate) unsafe fn write(
    at: NonNull<u8>,
    usable_size: usize,
    next_free: Option<NonNull<BlockHeader>>,
  ) -> NonNull<BlockHeader> {
    let block = at.cast::<BlockHeader>();
    unsafe {
      block.write(BlockHeader {
        usable_size,
        next_free,
      });
    }
    block
  }

  /// Header owning the payload at `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by the arena's allocation path.
  pub(crate) unsafe fn from_payload(payload: NonNull<u8>) -> NonNull<BlockHeader> {
    unsafe { payload.sub(HEADER_SIZE) }.cast()
  }

  #[inline]
  pub(crate) fn payload(block: NonNull<BlockHeader>) -> NonNull<u8> {
    // The payload of a valid header never runs past the arena end.
    unsafe { block.cast::<u8>().add(HEADER_SIZE) }
  }

  #[inline]
  pub(crate) unsafe fn size(block: NonNull<BlockHeader>) -> usize {
    unsafe { (*block.as_ptr()).usable_size }
  }

  #[inline]
  pub(crate) unsafe fn set_size(
    block: NonNull<BlockHeader>,
    usable_size: usize,
  ) {
    unsafe { (*block.as_ptr()).usable_size = usable_size }
  }

  #[inline]
  pub(crate) unsafe fn next(block: NonNull<BlockHeader>) -> Option<NonNull<BlockHeader>> {
    unsafe { (*block.as_ptr()).next_free }
  }

  #[inline]
  pub(crate) unsafe fn set_next(
    block: NonNull<BlockHeader>,
    next_free: Option<NonNull<BlockHeader>>,
  ) {
    unsafe { (*block.as_ptr()).next_free = next_free }
  }

  /// Address one past the block's payload, i.e. where the neighbouring header starts.
  #[inline]
  pub(crate) unsafe fn end(block: NonNull<BlockHeader>) -> usize {
    block.as_ptr() as usize + HEADER_SIZE + unsafe { Self::size(block) }
  }

  /// Whether `next` begins exactly where `block` ends.
  #[inline]
  pub(crate) unsafe fn is_adjacent(
    block: NonNull<BlockHeader>,
    next: NonNull<BlockHeader>,
  ) -> bool {
    unsafe { Self::end(block) == next.as_ptr() as usize }
  }
}

/// Whether a free block of `usable_size` bytes may serve an aligned request of
/// `request` bytes: either an exact fit, or room for the request, a new header, and
/// a non-empty remainder.
#[inline]
pub fn is_eligible(
  usable_size: usize,
  request: usize,
) -> bool {
  usable_size == request
    || request
      .checked_add(HEADER_SIZE)
      .is_some_and(|needed| usable_size > needed)
}
