use brk_alloc::Heap;
use std::{hint::black_box, mem, time::Instant};

fn main() {
	let start = Instant::now();

	let heap = Heap::new();
	const CAPACITY: usize = 200;

	for _ in 0..100_000_000 {
		let ptr = heap.allocate(CAPACITY);
		assert!(!ptr.is_null());

		// SAFETY: `msg` will never try to deallocate or reallocate through the global allocator.
		let mut msg = unsafe { String::from_raw_parts(ptr, 0, CAPACITY) };
		msg.push_str("Hello, ");
		msg.push_str("world!");
		msg = black_box(msg);

		// SAFETY: `msg.as_mut_ptr()` is exactly the pointer `heap.allocate` handed back above.
		unsafe {
			heap.free(msg.as_mut_ptr());
		}

		// If we let `msg` drop itself, it would call `dealloc()` on the global allocator (not
		// `heap`), which is undefined behavior.
		mem::forget(msg);
	}

	println!("Elapsed: {}ms", start.elapsed().as_millis());
}
