//! Error types for the handful of fallible entry points that are not part
//! of the C-malloc-shaped surface (which signals failure via null
//! pointers instead).

use std::fmt;

/// Failure to bring up a [`Heap`](crate::Heap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapInitError {
  /// The very first `sbrk` call for the sentinel region failed.
  ArenaExhausted,
}

impl fmt::Display for HeapInitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HeapInitError::ArenaExhausted => {
        write!(f, "arena exhausted while reserving sentinel words")
      }
    }
  }
}

impl std::error::Error for HeapInitError {}
