/// Alignment boundary of every block header and every payload handed out by an arena.
///
/// Matches the strictest fundamental alignment on the targets we care about, so a
/// payload can hold any scalar or SIMD-friendly value without extra padding.
pub const ALIGNMENT: usize = 16;

/// Rounds `value` up to the arena alignment boundary.
///
/// # Examples
///
/// ```rust
/// use arenalloc::align;
///
/// assert_eq!(align!(0), 0);
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(32), 32);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Overflow-checked form of [`align!`], used on caller-supplied request sizes.
#[inline]
pub const fn align_up(value: usize) -> Option<usize> {
  match value.checked_add(ALIGNMENT - 1) {
    Some(padded) => Some(padded & !(ALIGNMENT - 1)),
    None => None,
  }
}

#[inline]
pub(crate) fn is_aligned(addr: usize) -> bool {
  addr & (ALIGNMENT - 1) == 0
}
