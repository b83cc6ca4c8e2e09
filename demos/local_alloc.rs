#![feature(allocator_api)]
use brk_alloc::Heap;
use std::time::Instant;

fn main() {
	let start = Instant::now();

	// One heap reused across every iteration: the program break only ever grows, so a fresh
	// `Heap` per iteration would exhaust address space long before the loop finished.
	let heap = Heap::new();

	for _ in 0..10_000_000 {
		let mut a = Vec::new_in(&heap);
		let mut b = Vec::new_in(&heap);
		for i in 0..10 {
			a.push(i);
			b.push(i);
		}
	}

	println!("{}", start.elapsed().as_millis());
}
