use std::io::Read;

use libc::sbrk;
use rallocator::Heap;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  // Wire up logging so the heap's extend/checkheap diagnostics are visible;
  // set RUST_LOG=debug to see every extension as it happens.
  env_logger::init();

  // Our explicit free-list heap. It owns the region sbrk hands it, and
  // tracks free blocks through an intrusive doubly linked list instead
  // of just bumping a pointer forward.
  let mut heap = Heap::init().expect("failed to bring up heap");

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate and free a small block, then allocate again to show the
    //    freed space gets reused instead of growing the break.
    // --------------------------------------------------------------------
    let first = heap.allocate(32);
    println!("\n[1] Allocated 32 bytes at {:?}", first);
    (first as *mut u32).write(0xDEADBEEF);
    println!("[1] Value written = 0x{:X}", (first as *mut u32).read());
    block_until_enter_pressed();

    heap.release(first);
    println!("[1] Released, checkheap = {}", heap.checkheap(true));
    let reused = heap.allocate(32);
    println!("[1] Reallocated 32 bytes at {:?} (same address: {})", reused, reused == first);
    heap.release(reused);

    // --------------------------------------------------------------------
    // 2) Allocate three blocks, free the middle one, then watch splitting
    //    and coalescing play out as further requests come in.
    // --------------------------------------------------------------------
    let a = heap.allocate(64);
    let b = heap.allocate(64);
    let c = heap.allocate(64);
    println!("\n[2] Three 64-byte blocks at {:?}, {:?}, {:?}", a, b, c);
    block_until_enter_pressed();

    heap.release(b);
    println!("[2] Freed the middle block, checkheap = {}", heap.checkheap(true));

    let small = heap.allocate(16);
    println!("[2] Small 16-byte request placed at {:?} (split from the freed slot)", small);

    heap.release(a);
    heap.release(small);
    heap.release(c);
    println!("[2] All released, checkheap = {}", heap.checkheap(true));

    // --------------------------------------------------------------------
    // 3) Resize and zero_alloc, the other two entry points.
    // --------------------------------------------------------------------
    let grown = heap.resize(std::ptr::null_mut(), 128);
    println!("\n[3] resize(null, 128) behaves like allocate: {:?}", grown);
    let zeroed = heap.zero_alloc(16, 4);
    println!("[3] zero_alloc(16, 4) at {:?}", zeroed);
    for i in 0..64 {
      assert_eq!(*zeroed.add(i), 0);
    }
    println!("[3] confirmed zero-initialized");

    heap.release(grown);
    heap.release(zeroed);

    print_program_break("end");
    println!("\nFinal checkheap result: {}", heap.checkheap(true));
  }
}
