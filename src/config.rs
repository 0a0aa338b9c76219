use std::env;

use serde::Deserialize;

use crate::{
  arena::MIN_ARENA_SIZE,
  error::{ArenaError, Result},
  fit::FitPolicyKind,
};

pub const DEFAULT_ARENA_SIZE: usize = 64 * 1024;

pub const SIZE_VAR: &str = "ARENALLOC_SIZE";
pub const FIT_POLICY_VAR: &str = "ARENALLOC_FIT_POLICY";

/// How a host wants its arena set up.
///
/// Deserializable so it can sit inside a larger configuration file:
///
/// ```yaml
/// size: 1048576
/// fit_policy: best
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
  /// Total arena size in bytes, descriptor included.
  pub size: usize,
  pub fit_policy: FitPolicyKind,
}

impl Default for ArenaConfig {
  fn default() -> Self {
    Self {
      size: DEFAULT_ARENA_SIZE,
      fit_policy: FitPolicyKind::default(),
    }
  }
}

impl ArenaConfig {
  /// Reads `ARENALLOC_SIZE` and `ARENALLOC_FIT_POLICY`, keeping defaults for unset
  /// variables.
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let mut config = Self::default();

    if let Some(size) = lookup(SIZE_VAR) {
      config.size = size
        .trim()
        .parse()
        .map_err(|e| ArenaError::InvalidConfig(format!("{SIZE_VAR}={size:?}: {e}")))?;
    }

    if let Some(policy) = lookup(FIT_POLICY_VAR) {
      config.fit_policy = policy.parse()?;
    }

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.size <= MIN_ARENA_SIZE {
      return Err(ArenaError::TooSmall {
        size: self.size,
        minimum: MIN_ARENA_SIZE + 1,
      });
    }
    Ok(())
  }
}
