/// Calculates the machine word alignment for the given size.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use rallocator::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + mem::size_of::<usize>() - 1) & !(mem::size_of::<usize>() - 1)
  };
}

/// Rounds `value` up to the nearest multiple of `align`, which must be a
/// power of two. Unlike [`align!`], the alignment is a parameter rather
/// than the machine word size — used to size allocator requests to an
/// arbitrary byte boundary (8 bytes, for this crate's payloads).
///
/// # Examples
///
/// ```rust
/// use rallocator::align_to;
///
/// assert_eq!(align_to!(1, 8), 8);
/// assert_eq!(align_to!(8, 8), 8);
/// assert_eq!(align_to!(9, 8), 16);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + ($align - 1)) & !($align - 1)
  };
}

#[cfg(test)]
mod tests {
  use std::mem;

  #[test]
  fn test_align() {
    let ptr_size = mem::size_of::<usize>();

    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ptr_size * i + 1)..=(ptr_size * (i + 1));

      let expected_alignment = ptr_size * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_align_to() {
    for align in [8usize, 16, 32] {
      for value in 1..=(align * 4) {
        let aligned = align_to!(value, align);
        assert!(aligned >= value);
        assert_eq!(aligned % align, 0);
        assert!(aligned - value < align);
      }
    }
  }
}
