//! Heap integrity checker. Walks the block list and the free list
//! independently and cross-checks them; returns 0 when every invariant
//! holds, a distinct nonzero code identifying the first violation found
//! otherwise.
//!
//! Mirrors the malloc-lab `mm_check`/`checkheap` convention of a single
//! "is everything consistent" entry point gated behind a verbose flag,
//! rather than a `Result`: this function is a diagnostic, not part of
//! the allocator's control flow.

use crate::block::{self, Tag};
use crate::freelist::{self, END_OF_LIST, FreeList, MIN_FREE_WORDS};

pub const OK: i32 = 0;
pub const ERR_HEADER_FOOTER_MISMATCH: i32 = 1;
pub const ERR_UNALIGNED_PAYLOAD: i32 = 2;
pub const ERR_OUT_OF_BOUNDS: i32 = 3;
pub const ERR_CONSECUTIVE_FREE_BLOCKS: i32 = 4;
pub const ERR_EPILOGUE_CORRUPT: i32 = 5;
pub const ERR_FREE_LIST_COUNT_MISMATCH: i32 = 6;
pub const ERR_FREE_LIST_NODE_NOT_FREE: i32 = 7;
pub const ERR_FREE_LIST_POINTER_OUT_OF_BOUNDS: i32 = 8;
pub const ERR_FREE_LIST_BACK_POINTER_MISMATCH: i32 = 9;
pub const ERR_BLOCK_TOO_SMALL: i32 = 10;

/// Minimum size, in words, of the prologue block (header + footer only).
const MIN_PROLOGUE_WORDS: u32 = 2;

/// Walks every block from `prologue` to the epilogue, then walks
/// `free_list`, cross-checking both. `heap_low`/`heap_high` bound the
/// addresses any in-heap pointer must fall within.
///
/// # Safety
/// `prologue` must be the heap's prologue header, and `heap_low`/
/// `heap_high` must bound the live heap region.
pub unsafe fn checkheap(
  prologue: *mut u32,
  heap_low: *const u8,
  heap_high: *const u8,
  free_list: &FreeList,
  verbose: bool,
) -> i32 {
  unsafe {
    let mut header = prologue;
    let mut is_prologue = true;
    let mut prev_was_free = false;
    let mut free_blocks_seen = 0usize;

    loop {
      let size = block::block_size(header);
      let tag = block::block_tag(header);

      if size == 0 {
        if tag != Tag::Allocated {
          return fail(verbose, ERR_EPILOGUE_CORRUPT, "epilogue not marked allocated");
        }
        break;
      }

      if (header as *const u8) < heap_low || (header as *const u8) >= heap_high {
        return fail(verbose, ERR_OUT_OF_BOUNDS, "block header outside heap bounds");
      }

      let min_words = if is_prologue { MIN_PROLOGUE_WORDS } else { MIN_FREE_WORDS };
      if size < min_words {
        return fail(verbose, ERR_BLOCK_TOO_SMALL, "block smaller than the minimum block size");
      }

      let footer = block::footer_of(header);
      if block::block_size(footer) != size || block::block_tag(footer) != tag {
        return fail(verbose, ERR_HEADER_FOOTER_MISMATCH, "header/footer disagree");
      }

      let payload = block::payload_of(header) as usize;
      if payload % 8 != 0 {
        return fail(verbose, ERR_UNALIGNED_PAYLOAD, "payload not 8-byte aligned");
      }

      let is_free = tag == Tag::Free;
      if is_free && prev_was_free {
        return fail(verbose, ERR_CONSECUTIVE_FREE_BLOCKS, "two free blocks left uncoalesced");
      }
      if is_free {
        free_blocks_seen += 1;
      }
      prev_was_free = is_free;
      is_prologue = false;

      header = block::next_block_header(header);
    }

    if free_blocks_seen != free_list.len() {
      return fail(
        verbose,
        ERR_FREE_LIST_COUNT_MISMATCH,
        "free blocks found by heap walk disagree with free list length",
      );
    }

    let mut node = unsafe { freelist::read_link(free_list.head_cell()) };
    let mut prev_slot_expected = free_list.head_cell() as usize;
    let mut walked = 0usize;
    while node != END_OF_LIST {
      let payload = node as *mut u32;
      if (payload as *const u8) < heap_low || (payload as *const u8) >= heap_high {
        return fail(verbose, ERR_FREE_LIST_POINTER_OUT_OF_BOUNDS, "free list node outside heap");
      }
      let node_header = block::header_of(payload);
      if !block::block_is_free(node_header) {
        return fail(verbose, ERR_FREE_LIST_NODE_NOT_FREE, "free list node not marked free");
      }
      if unsafe { freelist::read_link(freelist::prev_slot(payload)) } != prev_slot_expected {
        return fail(
          verbose,
          ERR_FREE_LIST_BACK_POINTER_MISMATCH,
          "free list node's prev_link does not point back at predecessor",
        );
      }
      prev_slot_expected = node;
      node = unsafe { freelist::read_link(freelist::succ_slot(payload)) };
      walked += 1;
    }
    if walked != free_list.len() {
      return fail(verbose, ERR_FREE_LIST_COUNT_MISMATCH, "free list traversal length mismatch");
    }

    OK
  }
}

fn fail(verbose: bool, code: i32, message: &str) -> i32 {
  if verbose {
    log::error!("checkheap: {message} (code {code})");
  }
  code
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::freelist::FreeList;

  #[test]
  fn clean_heap_passes() {
    let mut head_word = [0u32; 2];
    // prologue(2,A) block(6,A) epilogue(0,A)
    let mut buf = [0u32; 9];
    unsafe {
      let prologue = buf.as_mut_ptr();
      block::set_size(prologue, 2);
      block::mark(prologue, Tag::Allocated);
      let block = prologue.add(2);
      block::set_size(block, 6);
      block::mark(block, Tag::Allocated);
      let epilogue = block.add(6);
      block::set_size(epilogue, 0);
      block::mark(epilogue, Tag::Allocated);

      let list = FreeList::new(head_word.as_mut_ptr());
      let low = buf.as_ptr() as *const u8;
      let high = epilogue.add(1) as *const u8;
      assert_eq!(checkheap(prologue, low, high, &list, false), OK);
    }
  }

  #[test]
  fn undersized_ordinary_block_is_caught() {
    let mut head_word = [0u32; 2];
    // prologue(2,A) block(4,A) epilogue(0,A) — 4 < MIN_FREE_WORDS (6)
    let mut buf = [0u32; 7];
    unsafe {
      let prologue = buf.as_mut_ptr();
      block::set_size(prologue, 2);
      block::mark(prologue, Tag::Allocated);
      let block = prologue.add(2);
      block::set_size(block, 4);
      block::mark(block, Tag::Allocated);
      let epilogue = block.add(4);
      block::set_size(epilogue, 0);
      block::mark(epilogue, Tag::Allocated);

      let list = FreeList::new(head_word.as_mut_ptr());
      let low = buf.as_ptr() as *const u8;
      let high = epilogue.add(1) as *const u8;
      assert_eq!(checkheap(prologue, low, high, &list, false), ERR_BLOCK_TOO_SMALL);
    }
  }

  #[test]
  fn undersized_prologue_is_caught() {
    let mut head_word = [0u32; 2];
    // prologue(1,A) — below MIN_PROLOGUE_WORDS (2)
    let mut buf = [0u32; 2];
    unsafe {
      let prologue = buf.as_mut_ptr();
      block::set_size(prologue, 1);
      block::mark(prologue, Tag::Allocated);

      let list = FreeList::new(head_word.as_mut_ptr());
      let low = buf.as_ptr() as *const u8;
      let high = unsafe { buf.as_ptr().add(buf.len()) } as *const u8;
      assert_eq!(checkheap(prologue, low, high, &list, false), ERR_BLOCK_TOO_SMALL);
    }
  }
}
