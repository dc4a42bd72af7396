//! Thin wrapper over `sbrk`, the sole source of heap memory for this
//! crate. Mirrors the malloc-lab `memlib.c` contract: extend the break by
//! some number of bytes, or fail.
//!
//! `Arena` does not itself remember every extension; it only tracks the
//! low and high addresses of the region it owns, since [`Heap`](crate::Heap)
//! never returns memory to the OS and the region only ever grows upward.

/// A single, monotonically growing region of the process break.
pub struct Arena {
  low: *const u8,
  high: *const u8,
}

impl Arena {
  /// Opens an arena at the current break, owning everything allocated
  /// through it from this point on. The region starts empty
  /// (`low == high`).
  pub fn new() -> Self {
    let brk = unsafe { libc::sbrk(0) } as *const u8;
    Self { low: brk, high: brk }
  }

  /// Extends the region by `n_bytes`, returning the start of the new
  /// space, or `None` if the kernel refused the request.
  pub fn heap_extend(&mut self, n_bytes: usize) -> Option<*mut u8> {
    let prev = unsafe { libc::sbrk(n_bytes as isize) };
    if prev == usize::MAX as *mut libc::c_void {
      log::error!("sbrk({n_bytes}) failed: arena exhausted");
      return None;
    }
    self.high = unsafe { self.high.add(n_bytes) };
    Some(prev as *mut u8)
  }

  /// Lowest address owned by this arena.
  #[inline]
  pub fn heap_low(&self) -> *const u8 {
    self.low
  }

  /// One past the highest address owned by this arena.
  #[inline]
  pub fn heap_high(&self) -> *const u8 {
    self.high
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extend_grows_high_by_requested_amount() {
    let mut arena = Arena::new();
    let low_before = arena.heap_low();
    let high_before = arena.heap_high();
    assert_eq!(low_before, high_before);

    let start = arena.heap_extend(4096).expect("sbrk should succeed in test env");
    assert_eq!(start as *const u8, high_before);
    assert_eq!(arena.heap_high(), unsafe { high_before.add(4096) });
    assert_eq!(arena.heap_low(), low_before);
  }
}
