use std::{fmt, marker::PhantomData, mem, ptr, ptr::NonNull};

use log::{debug, trace, warn};

use crate::{
  align::{ALIGNMENT, align_up, is_aligned},
  block::{BlockHeader, HEADER_SIZE, is_eligible},
  config::ArenaConfig,
  error::{ArenaError, Result},
  fit::{FIRST_FIT, FitPolicy, FreeBlocks},
};

/// Descriptor stored at the first address of every arena.
#[repr(C, align(16))]
struct ArenaHeader {
  total_size: usize,
  policy: &'static dyn FitPolicy,
  free_list_head: Option<NonNull<BlockHeader>>,
}

/// Size of the arena descriptor, a multiple of [`ALIGNMENT`].
pub const ARENA_HEADER_SIZE: usize = mem::size_of::<ArenaHeader>();

/// An arena must be strictly larger than this to hold its descriptor and one block.
pub const MIN_ARENA_SIZE: usize = ARENA_HEADER_SIZE + HEADER_SIZE;

const _: () = assert!(ARENA_HEADER_SIZE % ALIGNMENT == 0);

/// Handle to an initialized arena.
///
/// All allocator state lives inside the managed region itself; the handle only
/// remembers where that region starts. Operations that mutate the arena take
/// `&mut self`, so one handle is never used by two callers at once.
pub struct Arena<'a> {
  header: NonNull<ArenaHeader>,
  _region: PhantomData<&'a mut [u8]>,
}

// The arena owns its region exclusively; moving the handle moves that ownership.
unsafe impl Send for Arena<'_> {}

/// One block as reported by [`Arena::blocks`] and [`Arena::show`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address of the block header.
  pub address: NonNull<u8>,
  pub usable_size: usize,
  pub is_free: bool,
}

/// Where a free block hangs off the free list.
#[derive(Clone, Copy)]
enum Link {
  Head,
  After(NonNull<BlockHeader>),
}

impl<'a> Arena<'a> {
  /// Lays out a fresh arena over `total_size` bytes starting at `region`.
  ///
  /// The region receives the arena descriptor followed by one free block spanning
  /// every remaining byte. The fit policy starts out as first-fit.
  ///
  /// # Safety
  ///
  /// `region` must be aligned to [`ALIGNMENT`], valid for reads and writes of
  /// `total_size` bytes for `'a`, not used by anything else for `'a`, and
  /// `total_size` must exceed [`MIN_ARENA_SIZE`]. None of this is checked in
  /// release builds; see [`Arena::from_slice`] for the checked entry point.
  pub unsafe fn init(
    region: NonNull<u8>,
    total_size: usize,
  ) -> Self {
    debug_assert!(is_aligned(region.as_ptr() as usize));
    debug_assert!(total_size > MIN_ARENA_SIZE);

    let header = region.cast::<ArenaHeader>();

    unsafe {
      let first = BlockHeader::write(
        region.add(ARENA_HEADER_SIZE),
        total_size - MIN_ARENA_SIZE,
        None,
      );

      header.write(ArenaHeader {
        total_size,
        policy: &FIRST_FIT,
        free_list_head: Some(first),
      });
    }

    debug!(
      "arena initialized at {:p}: {} bytes, {} usable",
      region,
      total_size,
      total_size - MIN_ARENA_SIZE
    );

    Self {
      header,
      _region: PhantomData,
    }
  }

  /// Lays out a fresh arena over `region`, validating size and alignment first.
  pub fn from_slice(region: &'a mut [u8]) -> Result<Self> {
    let total_size = region.len();
    let start = NonNull::from(region).cast::<u8>();
    let address = start.as_ptr() as usize;

    if !is_aligned(address) {
      return Err(ArenaError::Misaligned {
        address,
        alignment: ALIGNMENT,
      });
    }

    if total_size <= MIN_ARENA_SIZE {
      return Err(ArenaError::TooSmall {
        size: total_size,
        minimum: MIN_ARENA_SIZE + 1,
      });
    }

    Ok(unsafe { Self::init(start, total_size) })
  }

  /// Like [`Arena::from_slice`], then installs the configured fit policy.
  ///
  /// The configured size is ignored: the slice length wins.
  pub fn from_slice_with(
    region: &'a mut [u8],
    config: &ArenaConfig,
  ) -> Result<Self> {
    let mut arena = Self::from_slice(region)?;
    arena.set_fit_policy(config.fit_policy.policy());
    Ok(arena)
  }

  #[inline]
  fn header(&self) -> &ArenaHeader {
    unsafe { self.header.as_ref() }
  }

  #[inline]
  fn header_mut(&mut self) -> &mut ArenaHeader {
    unsafe { self.header.as_mut() }
  }

  pub fn total_size(&self) -> usize {
    self.header().total_size
  }

  /// Address of the first byte of the arena, where its descriptor lives.
  pub fn start(&self) -> NonNull<u8> {
    self.header.cast()
  }

  #[inline]
  fn end(&self) -> usize {
    self.header.as_ptr() as usize + self.total_size()
  }

  #[inline]
  fn first_block(&self) -> NonNull<BlockHeader> {
    unsafe { self.header.cast::<u8>().add(ARENA_HEADER_SIZE) }.cast()
  }

  pub fn fit_policy(&self) -> &'static dyn FitPolicy {
    self.header().policy
  }

  /// Replaces the active fit policy. No block is touched.
  pub fn set_fit_policy(
    &mut self,
    policy: &'static dyn FitPolicy,
  ) {
    debug!("arena {:p}: fit policy set to {}", self.header, policy.name());
    self.header_mut().policy = policy;
  }

  /// The free list, in ascending address order.
  pub fn free_blocks(&self) -> FreeBlocks<'_> {
    FreeBlocks::new(self.header().free_list_head)
  }

  /// Allocates `size` bytes, rounded up to [`ALIGNMENT`].
  ///
  /// Returns the payload address, or `None` when the active policy finds no
  /// suitable free block. A failed allocation leaves the arena untouched.
  pub fn alloc(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let Some(request) = align_up(size) else {
      trace!("alloc({}): request overflows alignment", size);
      return None;
    };

    let policy = self.fit_policy();
    let Some(chosen) = policy.select(self.free_blocks(), request) else {
      trace!("alloc({}): no free block fits under {}-fit", size, policy.name());
      return None;
    };

    let block = chosen.header();
    let block_size = chosen.usable_size();

    if !is_eligible(block_size, request) {
      warn!(
        "alloc({}): {}-fit picked a {} byte block that cannot serve {} bytes",
        size,
        policy.name(),
        block_size,
        request
      );
      return None;
    }

    let Some(link) = self.find_link(block) else {
      warn!(
        "alloc({}): {}-fit picked {:p}, which is not on the free list",
        size,
        policy.name(),
        block
      );
      return None;
    };

    unsafe {
      let successor = if block_size == request {
        trace!("alloc({}): exact fit, unlinking {:p}", size, block);
        BlockHeader::next(block)
      } else {
        let remainder = BlockHeader::write(
          BlockHeader::payload(block).add(request),
          block_size - request - HEADER_SIZE,
          BlockHeader::next(block),
        );
        BlockHeader::set_size(block, request);
        trace!(
          "alloc({}): split {:p} ({} bytes), remainder {:p} ({} bytes)",
          size,
          block,
          block_size,
          remainder,
          block_size - request - HEADER_SIZE
        );
        Some(remainder)
      };

      self.set_link(link, successor);
    }

    Some(BlockHeader::payload(block))
  }

  /// Allocates `size` zeroed bytes.
  pub fn zalloc(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let payload = self.alloc(size)?;
    unsafe { ptr::write_bytes(payload.as_ptr(), 0, size) };
    Some(payload)
  }

  /// Allocates zeroed room for `count` elements of `size` bytes each.
  pub fn calloc(
    &mut self,
    count: usize,
    size: usize,
  ) -> Option<NonNull<u8>> {
    self.zalloc(count.checked_mul(size)?)
  }

  /// Returns a block to the free list and merges it with address-adjacent free
  /// neighbours.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by an allocation on this arena and not been
  /// released since. Anything else corrupts the arena.
  pub unsafe fn free(
    &mut self,
    payload: NonNull<u8>,
  ) {
    let block = unsafe { BlockHeader::from_payload(payload) };

    debug_assert!(self.contains(block), "freed pointer lies outside the arena");
    debug_assert!(!self.is_free(block.cast()), "double free of {:p}", payload);

    let head = self.header().free_list_head;

    let current = unsafe {
      match head {
        Some(head) if head < block => {
          let mut prev = head;
          while let Some(next) = BlockHeader::next(prev) {
            if next >= block {
              break;
            }
            prev = next;
          }

          BlockHeader::set_next(block, BlockHeader::next(prev));
          BlockHeader::set_next(prev, Some(block));

          if BlockHeader::is_adjacent(prev, block) {
            trace!("free({:p}): merging into free predecessor {:p}", block, prev);
            Self::absorb_next(prev);
            prev
          } else {
            block
          }
        }
        _ => {
          BlockHeader::set_next(block, head);
          self.header_mut().free_list_head = Some(block);
          block
        }
      }
    };

    unsafe {
      if let Some(next) = BlockHeader::next(current) {
        if BlockHeader::is_adjacent(current, next) {
          trace!("free({:p}): absorbing free successor {:p}", block, next);
          Self::absorb_next(current);
        }
      }
    }
  }

  /// Merges the free-list successor of `block` into it.
  ///
  /// # Safety
  ///
  /// `block` must be free and have a successor that starts where it ends.
  unsafe fn absorb_next(block: NonNull<BlockHeader>) {
    unsafe {
      if let Some(next) = BlockHeader::next(block) {
        BlockHeader::set_size(
          block,
          BlockHeader::size(block) + HEADER_SIZE + BlockHeader::size(next),
        );
        BlockHeader::set_next(block, BlockHeader::next(next));
      }
    }
  }

  /// Resizes an allocation, moving it when its block is too small.
  ///
  /// `None` as `payload` behaves like [`Arena::alloc`]. The block is never shrunk
  /// in place. When no block can hold `new_size`, `None` is returned and the
  /// original allocation is left intact.
  ///
  /// # Safety
  ///
  /// Same contract as [`Arena::free`] for `payload`.
  pub unsafe fn realloc(
    &mut self,
    payload: Option<NonNull<u8>>,
    new_size: usize,
  ) -> Option<NonNull<u8>> {
    let Some(payload) = payload else {
      return self.alloc(new_size);
    };

    let current = unsafe { self.get_allocated_size(payload) };
    if align_up(new_size)? <= current {
      return Some(payload);
    }

    let moved = self.alloc(new_size)?;
    unsafe {
      ptr::copy_nonoverlapping(payload.as_ptr(), moved.as_ptr(), current);
      self.free(payload);
    }

    trace!("realloc({:p}, {}): moved to {:p}", payload, new_size, moved);
    Some(moved)
  }

  /// Number of bytes the caller may use behind `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by an allocation on this arena and not been
  /// released since.
  pub unsafe fn get_allocated_size(
    &self,
    payload: NonNull<u8>,
  ) -> usize {
    unsafe { BlockHeader::size(BlockHeader::from_payload(payload)) }
  }

  /// Header address of the block owning `payload`, as reported by [`Arena::blocks`].
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by an allocation on this arena.
  pub unsafe fn block_of(
    &self,
    payload: NonNull<u8>,
  ) -> NonNull<u8> {
    unsafe { BlockHeader::from_payload(payload) }.cast()
  }

  /// Whether the block whose header sits at `block` is on the free list.
  ///
  /// Linear in the length of the free list.
  pub fn is_free(
    &self,
    block: NonNull<u8>,
  ) -> bool {
    self.free_blocks().any(|free| free.address() == block)
  }

  /// Every block of the arena, free or used, in ascending address order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      current: self.first_block(),
      end: self.end(),
      next_free: self.header().free_list_head,
      _arena: PhantomData,
    }
  }

  /// Hands every block's header address, usable size and status to `callback`.
  pub fn show(
    &self,
    mut callback: impl FnMut(NonNull<u8>, usize, bool),
  ) {
    for block in self.blocks() {
      callback(block.address, block.usable_size, block.is_free);
    }
  }

  fn contains(
    &self,
    block: NonNull<BlockHeader>,
  ) -> bool {
    let address = block.as_ptr() as usize;
    address >= self.first_block().as_ptr() as usize && address + HEADER_SIZE <= self.end()
  }

  fn find_link(
    &self,
    target: NonNull<BlockHeader>,
  ) -> Option<Link> {
    let mut link = Link::Head;
    for free in self.free_blocks() {
      if free.header() == target {
        return Some(link);
      }
      link = Link::After(free.header());
    }
    None
  }

  unsafe fn set_link(
    &mut self,
    link: Link,
    to: Option<NonNull<BlockHeader>>,
  ) {
    match link {
      Link::Head => self.header_mut().free_list_head = to,
      Link::After(prev) => unsafe { BlockHeader::set_next(prev, to) },
    }
  }
}

impl fmt::Debug for Arena<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Arena")
      .field("start", &self.header)
      .field("total_size", &self.total_size())
      .field("fit_policy", &self.fit_policy().name())
      .field("free_list_head", &self.header().free_list_head)
      .finish()
  }
}

/// Iterator over every block of an arena, see [`Arena::blocks`].
///
/// Walks headers by size and follows the free list alongside, so each block's
/// status costs nothing extra.
pub struct Blocks<'a> {
  current: NonNull<BlockHeader>,
  end: usize,
  next_free: Option<NonNull<BlockHeader>>,
  _arena: PhantomData<&'a BlockHeader>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let block = self.current;
    if block.as_ptr() as usize >= self.end {
      return None;
    }

    let usable_size = unsafe { BlockHeader::size(block) };
    let is_free = self.next_free == Some(block);
    if is_free {
      self.next_free = unsafe { BlockHeader::next(block) };
    }

    // Lands on the next header, or one past the arena end after the last block.
    self.current = unsafe { BlockHeader::payload(block).add(usable_size) }.cast();

    Some(BlockInfo {
      address: block.cast(),
      usable_size,
      is_free,
    })
  }
}
