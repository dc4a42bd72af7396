//! Façade tying the arena, block codec, free list, placement, coalescing
//! and checker together into the public allocate/release/resize API.

use std::ptr;

use crate::align_to;
use crate::arena::Arena;
use crate::block::{self, Tag, WORD_BYTES};
use crate::checker;
use crate::coalesce;
use crate::error::HeapInitError;
use crate::freelist::{self, FreeList, MIN_FREE_WORDS};
use crate::place;

/// Growth granularity, in words, used whenever the heap must be extended
/// to satisfy a request no free block can fit.
pub const CHUNK_WORDS: usize = 1024;

/// head cell (2) + one placeholder word + prologue header+footer (2) +
/// the epilogue header (1) = 6 words. The placeholder sits *before* the
/// prologue, not after it, so the prologue's footer directly precedes
/// the first real block with no gap — mirrors the original `mm_init`'s
/// sentinel ordering. With an 8-byte-aligned heap base this also lands
/// every payload (prologue's and every real block's) on an 8-byte
/// boundary.
const SENTINEL_WORDS: usize = 6;

/// An explicit free-list heap grown from a single [`Arena`].
pub struct Heap {
  arena: Arena,
  free_list: FreeList,
  prologue: *mut u32,
  epilogue: *mut u32,
}

impl Heap {
  /// Brings up a heap: reserves the sentinel region, then grows by one
  /// [`CHUNK_WORDS`]-sized chunk of usable free space.
  pub fn init() -> Result<Heap, HeapInitError> {
    let mut arena = Arena::new();
    let base = arena
      .heap_extend(SENTINEL_WORDS * WORD_BYTES)
      .ok_or(HeapInitError::ArenaExhausted)? as *mut u32;

    let head_cell = base;
    // word 2: size-0 placeholder, purely alignment padding. It is never
    // part of the block chain; the prologue's footer is what
    // `prev_block_header` reads for the first real block.
    let placeholder = unsafe { base.add(2) };
    unsafe {
      block::set_size(placeholder, 0);
      block::mark(placeholder, Tag::Allocated);
    }
    let prologue = unsafe { base.add(3) };
    unsafe {
      block::set_size(prologue, 2);
      block::mark(prologue, Tag::Allocated);
    }
    let epilogue = unsafe { prologue.add(2) };
    unsafe {
      block::set_size(epilogue, 0);
      block::mark(epilogue, Tag::Allocated);
    }

    let free_list = unsafe { FreeList::new(head_cell) };
    let mut heap = Heap { arena, free_list, prologue, epilogue };
    heap.extend(CHUNK_WORDS).ok_or(HeapInitError::ArenaExhausted)?;
    Ok(heap)
  }

  /// Grows the arena by `words` (rounded up to an even count) and folds
  /// the new space in as one free block, reusing the old epilogue's
  /// header slot and coalescing with whatever free block preceded it.
  fn extend(&mut self, words: usize) -> Option<*mut u32> {
    let words = if words % 2 == 0 { words } else { words + 1 };
    self.arena.heap_extend(words * WORD_BYTES)?;

    let new_header = self.epilogue;
    unsafe {
      block::set_size(new_header, words as u32);
      block::mark(new_header, Tag::Free);

      let new_epilogue = block::next_block_header(new_header);
      block::set_size(new_epilogue, 0);
      block::mark(new_epilogue, Tag::Allocated);
      self.epilogue = new_epilogue;

      log::debug!("heap extended by {words} words");
      Some(coalesce::coalesce(&mut self.free_list, new_header))
    }
  }

  /// Number of words (header + footer + payload, all rounded) an
  /// `n_bytes` request needs, floored at [`MIN_FREE_WORDS`] so every
  /// allocated block can later hold free-list links once released.
  fn request_size_words(n_bytes: isize) -> u32 {
    debug_assert!(n_bytes > 0);
    let with_overhead = n_bytes as usize + 2 * WORD_BYTES;
    let rounded = align_to!(with_overhead, 8);
    (rounded / WORD_BYTES).max(MIN_FREE_WORDS as usize) as u32
  }

  /// First-fit search of the free list for a block of at least `asize`
  /// words.
  fn find_fit(&self, asize: u32) -> Option<*mut u32> {
    let mut node = unsafe { freelist::read_link(self.free_list.head_cell()) };
    while node != freelist::END_OF_LIST {
      let payload = node as *mut u32;
      let header = unsafe { block::header_of(payload) };
      if unsafe { block::block_size(header) } >= asize {
        return Some(header);
      }
      node = unsafe { freelist::read_link(freelist::succ_slot(payload)) };
    }
    None
  }

  /// Allocates at least `n_bytes` of 8-byte-aligned memory. Returns null
  /// on a non-positive request or on arena exhaustion.
  ///
  /// # Safety
  /// The returned pointer, if non-null, is valid for `n_bytes` and must
  /// only be passed to [`Heap::release`] or [`Heap::resize`] on this same
  /// `Heap`.
  pub unsafe fn allocate(&mut self, n_bytes: isize) -> *mut u8 {
    if n_bytes <= 0 {
      return ptr::null_mut();
    }
    let asize = Self::request_size_words(n_bytes);

    let header = match self.find_fit(asize) {
      Some(header) => {
        unsafe { self.free_list.unlink(block::payload_of(header)) };
        header
      }
      None => match self.extend(asize.max(CHUNK_WORDS as u32) as usize) {
        Some(header) => {
          unsafe { self.free_list.unlink(block::payload_of(header)) };
          header
        }
        None => return ptr::null_mut(),
      },
    };

    unsafe { place::place(&mut self.free_list, header, asize) };
    self.audit();
    unsafe { block::payload_of(header) as *mut u8 }
  }

  /// Returns a previously allocated block to the free list, coalescing
  /// with free neighbors. A null pointer is a no-op.
  ///
  /// # Safety
  /// `p`, if non-null, must have come from [`Heap::allocate`],
  /// [`Heap::resize`] or [`Heap::zero_alloc`] on this `Heap`, and not
  /// already have been released.
  pub unsafe fn release(&mut self, p: *mut u8) {
    if p.is_null() {
      return;
    }
    let header = unsafe { block::header_of(p as *mut u32) };
    unsafe {
      block::mark(header, Tag::Free);
      coalesce::coalesce(&mut self.free_list, header);
    }
    self.audit();
  }

  /// Resizes a block, preserving the lesser of the old and new sizes'
  /// worth of content. `p` null behaves as [`Heap::allocate`]; `n_bytes`
  /// non-positive behaves as [`Heap::release`] and returns null.
  ///
  /// # Safety
  /// Same preconditions on `p` as [`Heap::release`].
  pub unsafe fn resize(&mut self, p: *mut u8, n_bytes: isize) -> *mut u8 {
    if p.is_null() {
      return unsafe { self.allocate(n_bytes) };
    }
    if n_bytes <= 0 {
      unsafe { self.release(p) };
      return ptr::null_mut();
    }

    let header = unsafe { block::header_of(p as *mut u32) };
    let old_words = unsafe { block::block_size(header) };
    let old_payload_bytes = (old_words as usize - 2) * WORD_BYTES;

    let new_ptr = unsafe { self.allocate(n_bytes) };
    if new_ptr.is_null() {
      return ptr::null_mut();
    }
    let copy_bytes = old_payload_bytes.min(n_bytes as usize);
    unsafe { ptr::copy_nonoverlapping(p, new_ptr, copy_bytes) };
    unsafe { self.release(p) };
    new_ptr
  }

  /// Allocates space for `count` elements of `unit` bytes each,
  /// zero-initialized. Null on overflow or arena exhaustion.
  ///
  /// # Safety
  /// Same postconditions as [`Heap::allocate`].
  pub unsafe fn zero_alloc(&mut self, count: usize, unit: usize) -> *mut u8 {
    let total = match count.checked_mul(unit) {
      Some(total) if total > 0 => total,
      _ => return ptr::null_mut(),
    };
    let p = unsafe { self.allocate(total as isize) };
    if !p.is_null() {
      unsafe { ptr::write_bytes(p, 0, total) };
    }
    p
  }

  /// Audits every invariant this heap is expected to hold. Returns 0 when
  /// clean, a nonzero [`checker`] error code on the first violation
  /// found.
  pub fn checkheap(&self, verbose: bool) -> i32 {
    unsafe {
      checker::checkheap(
        self.prologue,
        self.arena.heap_low(),
        self.arena.heap_high(),
        &self.free_list,
        verbose,
      )
    }
  }

  fn audit(&self) {
    if cfg!(any(feature = "checked", debug_assertions)) {
      let code = self.checkheap(true);
      if code != checker::OK {
        panic!("heap integrity check failed with code {code}");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocate_then_release_round_trip() {
    let mut heap = Heap::init().expect("sbrk should succeed in test env");
    unsafe {
      let p = heap.allocate(64);
      assert!(!p.is_null());
      assert_eq!(heap.checkheap(false), checker::OK);
      heap.release(p);
      assert_eq!(heap.checkheap(false), checker::OK);
    }
  }

  #[test]
  fn allocate_zero_or_negative_returns_null() {
    let mut heap = Heap::init().expect("sbrk should succeed in test env");
    unsafe {
      assert!(heap.allocate(0).is_null());
      assert!(heap.allocate(-1).is_null());
    }
  }

  #[test]
  fn release_null_is_noop() {
    let mut heap = Heap::init().expect("sbrk should succeed in test env");
    unsafe { heap.release(ptr::null_mut()) };
    assert_eq!(heap.checkheap(false), checker::OK);
  }

  #[test]
  fn resize_preserves_content() {
    let mut heap = Heap::init().expect("sbrk should succeed in test env");
    unsafe {
      let p = heap.allocate(16) as *mut u8;
      for i in 0..16u8 {
        *p.add(i as usize) = i;
      }
      let q = heap.resize(p, 256);
      assert!(!q.is_null());
      for i in 0..16u8 {
        assert_eq!(*q.add(i as usize), i);
      }
      heap.release(q);
    }
  }

  #[test]
  fn zero_alloc_zeroes_memory() {
    let mut heap = Heap::init().expect("sbrk should succeed in test env");
    unsafe {
      let p = heap.zero_alloc(8, 4);
      assert!(!p.is_null());
      for i in 0..32 {
        assert_eq!(*p.add(i), 0);
      }
      heap.release(p);
    }
  }

  #[test]
  fn repeated_alloc_release_reuses_freed_space() {
    let mut heap = Heap::init().expect("sbrk should succeed in test env");
    unsafe {
      let a = heap.allocate(128);
      heap.release(a);
      let b = heap.allocate(128);
      assert_eq!(a, b, "freed block should be reused by first fit");
      heap.release(b);
    }
  }

  #[test]
  fn forces_extension_past_one_chunk() {
    let mut heap = Heap::init().expect("sbrk should succeed in test env");
    unsafe {
      let huge = (CHUNK_WORDS * WORD_BYTES * 2) as isize;
      let p = heap.allocate(huge);
      assert!(!p.is_null());
      assert_eq!(heap.checkheap(false), checker::OK);
      heap.release(p);
    }
  }
}
