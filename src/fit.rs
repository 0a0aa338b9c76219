//! Block selection strategies.
//!
//! A policy sees the free list as an address-ordered sequence of [`FreeBlock`]s and
//! picks the one that should serve a request. Every built-in policy only returns
//! blocks for which [`is_eligible`] holds; the allocation engine re-checks the
//! choice of custom policies.

use std::{fmt, marker::PhantomData, ptr::NonNull, str::FromStr};

use serde::Deserialize;

use crate::{
  block::{BlockHeader, is_eligible},
  error::ArenaError,
};

/// A read-only view of one block on the free list.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock<'a> {
  header: NonNull<BlockHeader>,
  _arena: PhantomData<&'a BlockHeader>,
}

impl<'a> FreeBlock<'a> {
  pub(crate) fn new(header: NonNull<BlockHeader>) -> Self {
    Self {
      header,
      _arena: PhantomData,
    }
  }

  /// Address of the block header.
  pub fn address(&self) -> NonNull<u8> {
    self.header.cast()
  }

  pub fn usable_size(&self) -> usize {
    // Live as long as the borrowed free list is not mutated.
    unsafe { BlockHeader::size(self.header) }
  }

  pub(crate) fn header(&self) -> NonNull<BlockHeader> {
    self.header
  }
}

impl fmt::Debug for FreeBlock<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("FreeBlock")
      .field("address", &self.header)
      .field("usable_size", &self.usable_size())
      .finish()
  }
}

/// Walks the free list from its head in ascending address order.
#[derive(Clone)]
pub struct FreeBlocks<'a> {
  current: Option<NonNull<BlockHeader>>,
  _arena: PhantomData<&'a BlockHeader>,
}

impl<'a> FreeBlocks<'a> {
  pub(crate) fn new(head: Option<NonNull<BlockHeader>>) -> Self {
    Self {
      current: head,
      _arena: PhantomData,
    }
  }
}

impl<'a> Iterator for FreeBlocks<'a> {
  type Item = FreeBlock<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    let block = self.current?;
    self.current = unsafe { BlockHeader::next(block) };
    Some(FreeBlock::new(block))
  }
}

/// Chooses which free block serves an allocation request.
///
/// `request` is already rounded up to the alignment boundary. Returning `None`
/// makes the allocation fail.
pub trait FitPolicy: Send + Sync {
  fn select<'a>(
    &self,
    free_list: FreeBlocks<'a>,
    request: usize,
  ) -> Option<FreeBlock<'a>>;

  fn name(&self) -> &'static str;
}

/// Returns the first eligible block from the head of the free list.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit;

/// Returns the smallest eligible block, lowest address on ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFit;

/// Returns the largest eligible block, lowest address on ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorstFit;

impl FitPolicy for FirstFit {
  fn select<'a>(
    &self,
    mut free_list: FreeBlocks<'a>,
    request: usize,
  ) -> Option<FreeBlock<'a>> {
    free_list.find(|block| is_eligible(block.usable_size(), request))
  }

  fn name(&self) -> &'static str {
    "first"
  }
}

impl FitPolicy for BestFit {
  fn select<'a>(
    &self,
    free_list: FreeBlocks<'a>,
    request: usize,
  ) -> Option<FreeBlock<'a>> {
    // `min_by_key` keeps the first minimum, which is the lowest address.
    free_list
      .filter(|block| is_eligible(block.usable_size(), request))
      .min_by_key(|block| block.usable_size())
  }

  fn name(&self) -> &'static str {
    "best"
  }
}

impl FitPolicy for WorstFit {
  fn select<'a>(
    &self,
    free_list: FreeBlocks<'a>,
    request: usize,
  ) -> Option<FreeBlock<'a>> {
    // `max_by_key` keeps the last maximum, so fold by hand to stay on the lowest address.
    free_list
      .filter(|block| is_eligible(block.usable_size(), request))
      .fold(None, |best: Option<FreeBlock<'a>>, block| match best {
        Some(best) if best.usable_size() >= block.usable_size() => Some(best),
        _ => Some(block),
      })
  }

  fn name(&self) -> &'static str {
    "worst"
  }
}

pub static FIRST_FIT: FirstFit = FirstFit;
pub static BEST_FIT: BestFit = BestFit;
pub static WORST_FIT: WorstFit = WorstFit;

/// Names a built-in policy, as found in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicyKind {
  #[default]
  First,
  Best,
  Worst,
}

impl FitPolicyKind {
  pub fn policy(self) -> &'static dyn FitPolicy {
    match self {
      FitPolicyKind::First => &FIRST_FIT,
      FitPolicyKind::Best => &BEST_FIT,
      FitPolicyKind::Worst => &WORST_FIT,
    }
  }
}

impl FromStr for FitPolicyKind {
  type Err = ArenaError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "first" | "first-fit" | "first_fit" => Ok(FitPolicyKind::First),
      "best" | "best-fit" | "best_fit" => Ok(FitPolicyKind::Best),
      "worst" | "worst-fit" | "worst_fit" => Ok(FitPolicyKind::Worst),
      _ => Err(ArenaError::UnknownPolicy(s.to_string())),
    }
  }
}
