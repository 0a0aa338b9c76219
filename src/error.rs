use thiserror::Error;

/// Failures of the checked entry points around the allocator core.
///
/// Running out of arena space is not an error: allocation simply returns `None`.
#[derive(Debug, Error)]
pub enum ArenaError {
  #[error("arena of {size} bytes is too small, at least {minimum} bytes are required")]
  TooSmall { size: usize, minimum: usize },

  #[error("arena start {address:#x} is not aligned to {alignment} bytes")]
  Misaligned { address: usize, alignment: usize },

  #[error("failed to map arena region: {0}")]
  Map(#[source] std::io::Error),

  #[error("unknown fit policy: {0:?}")]
  UnknownPolicy(String),

  #[error("invalid arena configuration: {0}")]
  InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ArenaError>;
