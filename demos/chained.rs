use brk_alloc::{AllocChain, SyncHeap};

use std::{alloc::System, hint::black_box, time::Instant};

// Install the program-break heap as the global allocator, falling back to the system allocator
// once it runs out of address space to extend into.
// Note: changing this to `UnsafeHeap` almost doubles speed in a genuinely single-threaded program.
#[global_allocator]
static GLOBAL: AllocChain<SyncHeap, System> = SyncHeap::new().chain(&System);

fn main() {
	let start = Instant::now();

	let mut big_strings = vec![];

	// Now create lots of small strings
	for i in 0..100_000_000 {
		black_box(String::from("hello!"));

		// Every once in a while, create and store a really big string
		if i % 10000 == 0 {
			big_strings.push("x".repeat(100_000));
		}
	}

	for s in big_strings {
		black_box(s);
	}

	println!("Elapsed: {}ms", start.elapsed().as_millis());
}
