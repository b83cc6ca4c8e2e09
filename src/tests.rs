//! Integration tests exercising the allocator's invariants and concrete end-to-end scenarios.
//!
//! Each test builds its own [`Heap`] so that chunks acquired from the OS program break by one
//! test never interfere with another's bucket/chunk-count assertions.

use crate::block::{self, BlockHeader, A};
use crate::heap::Heap;

unsafe fn header_of(p: *mut u8) -> *mut BlockHeader {
	unsafe { BlockHeader::header_from_payload(p) }
}

// ---------------------------------------------------------------------------------------------
// Boundary cases
// ---------------------------------------------------------------------------------------------

#[test]
fn allocate_zero_returns_null_without_error() {
	let heap = Heap::new();
	assert!(heap.allocate(0).is_null());
}

#[test]
fn free_of_null_is_a_noop() {
	let heap = Heap::new();
	unsafe { heap.free(core::ptr::null_mut()) };
}

#[test]
fn reallocate_null_behaves_like_allocate() {
	let heap = Heap::new();
	let p = unsafe { heap.reallocate(core::ptr::null_mut(), 40) };
	assert!(!p.is_null());
	assert_eq!(p.addr() % A, 0);
}

#[test]
fn reallocate_to_zero_frees_and_returns_dangling_nonnull() {
	let heap = Heap::new();
	let p = heap.allocate(32);
	assert!(!p.is_null());

	let before: usize = heap.bucket_counts().iter().sum();
	let dangling = unsafe { heap.reallocate(p, 0) };

	assert!(!dangling.is_null());
	assert_eq!(dangling.addr() % A, 0);
	assert!(heap.bucket_counts().iter().sum::<usize>() >= before);
}

#[test]
fn cleared_allocate_with_zero_count_or_unit_returns_null() {
	let heap = Heap::new();
	assert!(heap.cleared_allocate(0, 8).is_null());
	assert!(heap.cleared_allocate(8, 0).is_null());
}

#[test]
fn cleared_allocate_overflow_returns_null() {
	let heap = Heap::new();
	assert!(heap.cleared_allocate(usize::MAX, 2).is_null());
}

// ---------------------------------------------------------------------------------------------
// Concrete end-to-end scenarios
// ---------------------------------------------------------------------------------------------

/// Scenario 1: cold allocate. One OS request happens, one chunk exists, the returned pointer is
/// 16-aligned, and the owning block's masked size is at least the rounded-up request.
#[test]
fn scenario_1_cold_allocate() {
	let heap = Heap::new();
	assert_eq!(heap.chunk_count(), 0);

	let p = heap.allocate(24);
	assert!(!p.is_null());
	assert_eq!(p.addr() % A, 0);
	assert_eq!(heap.chunk_count(), 1);

	let header = unsafe { header_of(p) };
	let size = unsafe { BlockHeader::size(header) };
	assert!(size >= block::align_up(24));
}

/// Scenario 2: free then reuse. No new program-break request happens, and the returned pointer
/// equals the original — coalescing reunites the heap into one free block and the subsequent
/// split carves the same leading prefix back out.
#[test]
fn scenario_2_free_and_reuse() {
	let heap = Heap::new();
	let p1 = heap.allocate(24);
	assert_eq!(heap.chunk_count(), 1);

	unsafe { heap.free(p1) };
	let p2 = heap.allocate(24);

	assert_eq!(heap.chunk_count(), 1, "reuse must not request a new chunk");
	assert_eq!(p1, p2);
}

/// Scenario 3: split and coalesce chain. Three blocks are carved from one cold chunk. Freeing the
/// first, then the last, then the middle should fuse the whole chunk back into a single free
/// block.
#[test]
fn scenario_3_split_and_coalesce_chain() {
	let heap = Heap::new();
	let a = heap.allocate(32);
	let b = heap.allocate(32);
	let c = heap.allocate(32);
	assert!(![a, b, c].iter().any(|p| p.is_null()));

	unsafe { heap.free(a) };
	unsafe { heap.free(c) };

	// A and C are disjoint free blocks (B still allocated in between).
	assert!(heap.bucket_counts().iter().sum::<usize>() >= 2);

	unsafe { heap.free(b) };

	// Freeing B closes the last gap: A, B and C physically bracket each other inside the same
	// chunk, so the result must coalesce into exactly one free block.
	assert_eq!(heap.bucket_counts().iter().sum::<usize>(), 1);
}

/// Scenario 6: reallocate preserves data. The first 10 bytes survive a grow to 1000 bytes, and
/// the old pointer ends up back in a free list rather than leaked.
#[test]
fn scenario_6_reallocate_preserves_data() {
	let heap = Heap::new();
	let p = heap.allocate(10);
	assert!(!p.is_null());

	let original: [u8; 10] = core::array::from_fn(|i| i as u8);
	unsafe { core::ptr::copy_nonoverlapping(original.as_ptr(), p, 10) };

	let before_free_blocks: usize = heap.bucket_counts().iter().sum();

	let grown = unsafe { heap.reallocate(p, 1000) };
	assert!(!grown.is_null());
	assert_ne!(grown, p, "growing by this much cannot be satisfied in place");

	let grown_bytes = unsafe { core::slice::from_raw_parts(grown, 10) };
	assert_eq!(grown_bytes, &original);

	let after_free_blocks: usize = heap.bucket_counts().iter().sum();
	assert!(after_free_blocks >= before_free_blocks);
}

// ---------------------------------------------------------------------------------------------
// Universal invariants
// ---------------------------------------------------------------------------------------------

/// Every free block reachable from a bucket head survives a fresh allocation request afterward —
/// a cheap smoke test that bucket linkage isn't corrupted by a spread of allocations across
/// several size classes.
#[test]
fn bucket_membership_survives_mixed_sizes() {
	let heap = Heap::new();
	let mut ptrs = vec![];
	for n in [8usize, 24, 40, 100, 500, 2000, 9000] {
		let p = heap.allocate(n);
		assert!(!p.is_null());
		ptrs.push(p);
	}
	for p in ptrs {
		unsafe { heap.free(p) };
	}

	let p = heap.allocate(16);
	assert!(!p.is_null());
}

/// Header and footer size fields stay in agreement under repeated alloc/free churn — corruption
/// here would make `split`/`coalesce`'s internal debug assertions fire well before this test's
/// final allocation could succeed.
#[test]
fn header_footer_size_agreement_holds_under_churn() {
	let heap = Heap::new();
	let mut live: Vec<*mut u8> = vec![];
	for round in 0..20usize {
		let p = heap.allocate(16 + round * 8);
		assert!(!p.is_null());
		live.push(p);
		if round % 3 == 0 && !live.is_empty() {
			let old = live.remove(0);
			unsafe { heap.free(old) };
		}
	}
	for p in live {
		unsafe { heap.free(p) };
	}
}

/// No two physically adjacent free blocks coexist after coalescing: freeing every live
/// allocation carved from a single chunk must leave exactly one free block in that chunk.
#[test]
fn no_adjacent_free_blocks_after_full_free() {
	let heap = Heap::new();
	let ptrs: Vec<_> = (0..5).map(|_| heap.allocate(32)).collect();
	assert!(ptrs.iter().all(|p| !p.is_null()));

	for p in &ptrs {
		unsafe { heap.free(*p) };
	}

	assert_eq!(heap.bucket_counts().iter().sum::<usize>(), 1);
}

/// Allocated payload ranges never overlap.
#[test]
fn allocated_ranges_are_disjoint() {
	let heap = Heap::new();
	let sizes = [16usize, 32, 48, 64, 96, 128];
	let ptrs: Vec<_> = sizes.iter().map(|&n| (heap.allocate(n), n)).collect();

	for (i, &(p1, n1)) in ptrs.iter().enumerate() {
		for &(p2, n2) in &ptrs[i + 1..] {
			let (a1, a2) = (p1.addr(), p2.addr());
			let disjoint = a1 + n1 <= a2 || a2 + n2 <= a1;
			assert!(disjoint, "allocations must not overlap");
		}
	}

	for (p, _) in ptrs {
		unsafe { heap.free(p) };
	}
}

/// Every payload pointer is 16-aligned and its owning block is at least as large as the caller's
/// request rounded up to 16.
#[test]
fn alignment_and_minimum_size() {
	let heap = Heap::new();
	for n in [1usize, 2, 15, 16, 17, 100, 4096] {
		let p = heap.allocate(n);
		assert!(!p.is_null());
		assert_eq!(p.addr() % A, 0);

		let header = unsafe { header_of(p) };
		let size = unsafe { BlockHeader::size(header) };
		assert!(size >= block::align_up(n));

		unsafe { heap.free(p) };
	}
}

// ---------------------------------------------------------------------------------------------
// Round-trip laws
// ---------------------------------------------------------------------------------------------

/// After a sequence of allocations whose net effect is the empty set of live allocations, at most
/// one maximal free block per chunk remains.
#[test]
fn full_lifecycle_leaves_at_most_one_block_per_chunk() {
	let heap = Heap::new();
	let ptrs: Vec<_> = (0..10).map(|i| heap.allocate(16 * (i + 1))).collect();
	for p in ptrs {
		unsafe { heap.free(p) };
	}
	assert!(heap.bucket_counts().iter().sum::<usize>() <= heap.chunk_count());
}

/// Allocate immediately followed by free of the same pointer leaves the observable heap
/// unchanged (same free-block population as before the pair).
#[test]
fn allocate_then_free_is_idempotent() {
	let heap = Heap::new();
	let warm = heap.allocate(8);
	unsafe { heap.free(warm) };

	let before = heap.bucket_counts();
	let p = heap.allocate(24);
	unsafe { heap.free(p) };
	let after = heap.bucket_counts();

	assert_eq!(before, after);
}

/// Reallocate preserves the first `min(original_size, new_size)` bytes when shrinking.
#[test]
fn reallocate_preserves_prefix_when_shrinking() {
	let heap = Heap::new();
	let p = heap.allocate(64);
	let pattern: Vec<u8> = (0..64).collect();
	unsafe { core::ptr::copy_nonoverlapping(pattern.as_ptr(), p, 64) };

	let shrunk = unsafe { heap.reallocate(p, 20) };
	assert!(!shrunk.is_null());
	let bytes = unsafe { core::slice::from_raw_parts(shrunk, 20) };
	assert_eq!(bytes, &pattern[..20]);
}

// ---------------------------------------------------------------------------------------------
// Chunk growth
// ---------------------------------------------------------------------------------------------

/// Contiguous growth with a free tail: allocate a large block to exhaust the cold chunk's
/// remainder, free it so it becomes the chunk's free tail, then force growth with an even larger
/// allocation. As long as nothing else in this process calls `sbrk` between the two
/// growth-triggering allocations (true for this minimal test body, run single-threaded against
/// its own `Heap`), the second growth extends the existing chunk in place rather than minting a
/// new one, so the chunk count must not change.
#[test]
fn contiguous_growth_extends_free_tail() {
	let heap = Heap::new();
	let first = heap.allocate(4096);
	assert!(!first.is_null());
	let chunks_after_first = heap.chunk_count();

	unsafe { heap.free(first) };

	let second = heap.allocate(4096 * 4);
	assert!(!second.is_null());

	assert_eq!(
		heap.chunk_count(),
		chunks_after_first,
		"a contiguous grant must extend the existing chunk, not mint a new one"
	);
	unsafe { heap.free(second) };
}

/// Non-contiguous growth: a second, independent heap acquires its own chunk from the OS program
/// break in between two allocations on the first heap. Since the program break only ever
/// advances, the first heap's next growth cannot be contiguous with its own chunk and must mint
/// a fresh chunk descriptor, leaving the older chunk's tail flags untouched.
#[test]
fn non_contiguous_growth_mints_new_chunk() {
	let heap_a = Heap::new();
	let first = heap_a.allocate(64);
	assert!(!first.is_null());
	let chunks_after_first = heap_a.chunk_count();
	let first_header = unsafe { header_of(first) };
	let had_next_before = unsafe { BlockHeader::has_physical_next(first_header) };

	let heap_b = Heap::new();
	let other = heap_b.allocate(4096);
	assert!(!other.is_null());

	let second = heap_a.allocate(4096 * 8);
	assert!(!second.is_null());

	assert_eq!(
		heap_a.chunk_count(),
		chunks_after_first + 1,
		"a program break consumed by another heap in between must force a fresh chunk"
	);
	assert_eq!(
		unsafe { BlockHeader::has_physical_next(first_header) },
		had_next_before,
		"the older chunk's tail adjacency flags must not change when a newer chunk is minted"
	);

	unsafe {
		heap_a.free(first);
		heap_a.free(second);
		heap_b.free(other);
	}
}

/// Two independent heaps never share a chunk, regardless of what the monotonically advancing
/// program break has done in the meantime on the other heap's behalf.
#[test]
fn independent_heaps_never_share_chunks() {
	let heap_a = Heap::new();
	let heap_b = Heap::new();

	let pa = heap_a.allocate(64);
	let pb = heap_b.allocate(64);
	assert!(!pa.is_null() && !pb.is_null());

	assert!(heap_a.chunk_count() >= 1);
	assert!(heap_b.chunk_count() >= 1);

	unsafe {
		heap_a.free(pa);
		heap_b.free(pb);
	}
}

// ---------------------------------------------------------------------------------------------
// Allocator-trait surface (needs nightly `allocator_api`)
// ---------------------------------------------------------------------------------------------

#[cfg(feature = "allocator-api")]
mod allocator_trait {
	use crate::UnsafeHeap;

	#[test]
	fn vec_through_unsafe_heap() {
		// SAFETY: this test is single-threaded.
		let heap = unsafe { UnsafeHeap::new() };
		let mut v: Vec<u8, _> = Vec::with_capacity_in(64, &heap);
		for i in 0..64u8 {
			v.push(i);
		}
		assert_eq!(v.len(), 64);
	}

	#[test]
	fn box_through_unsafe_heap() {
		// SAFETY: this test is single-threaded.
		let heap = unsafe { UnsafeHeap::new() };
		let b = Box::new_in(42u64, &heap);
		assert_eq!(*b, 42);
	}

	#[test]
	fn vec_growth_round_trip_through_unsafe_heap() {
		// SAFETY: this test is single-threaded.
		let heap = unsafe { UnsafeHeap::new() };
		let mut v: Vec<u32, _> = Vec::new_in(&heap);
		for i in 0..1000u32 {
			v.push(i);
		}
		assert_eq!(v.iter().sum::<u32>(), (0..1000u32).sum());
	}
}
