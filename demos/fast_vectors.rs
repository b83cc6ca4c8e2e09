use brk_alloc::UnsafeHeap;
use std::time::Instant;

// SAFETY: The program is single-threaded.
#[global_allocator]
static GLOBAL: UnsafeHeap = unsafe { UnsafeHeap::new() };

fn main() {
	// Set RUST_LOG=trace to watch every allocate()/free() pass through the heap.
	env_logger::init();

	let start = Instant::now();
	for _ in 0..10_000_000 {
		let mut a = vec![];
		let mut b = vec![];
		for i in 0..10 {
			a.push(i);
			b.push(i);
		}

		// Dropping here returns both vectors' blocks to the heap's free lists, so the next
		// iteration's allocations are satisfied without touching the program break again.
		drop(a);
		drop(b);
	}

	println!("Elapsed: {}ms", start.elapsed().as_millis());
}
