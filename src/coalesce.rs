//! Immediate coalescing of a newly freed block with any free neighbors,
//! using the boundary tags in `block` to find both neighbors in O(1).
//!
//! The prologue and epilogue are permanently marked allocated, so a block
//! at either end of the heap simply never "sees" a free neighbor there —
//! no explicit bounds checks are needed in any of the four cases below.

use crate::block::{self, Tag};
use crate::freelist::FreeList;

/// Merges the free block at `header` with any free physical neighbors and
/// re-links the result at the front of `free_list`. `header` itself must
/// not yet be linked into `free_list` and must already be marked free.
///
/// Returns the header of the (possibly merged) block.
///
/// # Safety
/// `header` must be a free block within the heap, with valid prologue and
/// epilogue sentinels bounding it.
pub unsafe fn coalesce(free_list: &mut FreeList, header: *mut u32) -> *mut u32 {
  unsafe {
    let prev_header = block::prev_block_header(header);
    let next_header = block::next_block_header(header);
    let prev_free = block::block_is_free(prev_header);
    let next_free = block::block_is_free(next_header);

    let merged = match (prev_free, next_free) {
      (false, false) => header,
      (false, true) => {
        free_list.unlink(block::payload_of(next_header));
        let size = block::block_size(header) + block::block_size(next_header);
        block::set_size(header, size);
        header
      }
      (true, false) => {
        free_list.unlink(block::payload_of(prev_header));
        let size = block::block_size(prev_header) + block::block_size(header);
        block::set_size(prev_header, size);
        prev_header
      }
      (true, true) => {
        // Steady-state free-list discipline keeps this from ever firing
        // (a freed block's neighbors are coalesced on every release, so
        // two free blocks are never adjacent going in) but it is kept as
        // a defensive fallback rather than assumed away.
        free_list.unlink(block::payload_of(prev_header));
        free_list.unlink(block::payload_of(next_header));
        let size = block::block_size(prev_header)
          + block::block_size(header)
          + block::block_size(next_header);
        block::set_size(prev_header, size);
        prev_header
      }
    };

    block::mark(merged, Tag::Free);
    free_list.push_front(block::payload_of(merged));
    merged
  }
}
