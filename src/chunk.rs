//! Acquiring memory from the operating system via the program break, incrementally.
//!
//! Chunks form a singly-linked stack in acquisition order, most-recent first. Because `sbrk` is
//! monotonic, only the most recently acquired chunk can ever be contiguous with a fresh grant —
//! so [`grow`] only ever compares against `latest`, never walks the whole stack.

use crate::align::Align;
use crate::block::{align_down, align_up, BlockHeader, A, BLOCK_OVERHEAD};
use crate::bucket::BucketTable;

/// Minimum number of bytes requested from the OS program-break primitive per chunk.
pub const MIN_CHUNK: usize = 256;

/// Descriptor prefixed to every OS-acquired span. Chunks are never returned to the OS.
#[repr(C)]
pub(crate) struct ChunkHeader {
	prev: *mut ChunkHeader,
	size: usize,
	_align: Align<A>,
}

pub(crate) const CHUNK_HEADER_SIZE: usize = core::mem::size_of::<ChunkHeader>();

const _: () = assert!(CHUNK_HEADER_SIZE % A == 0);

/// Walks from the first block of `chunk` to its physically-last block.
unsafe fn last_block_of(chunk: *mut ChunkHeader) -> *mut BlockHeader {
	unsafe {
		let mut b: *mut BlockHeader = (chunk as *mut u8).add(CHUNK_HEADER_SIZE).cast();
		while let Some(next) = BlockHeader::physical_next(b) {
			b = next;
		}
		b
	}
}

/// Moves the program break forward by `amount` bytes, returning the break's value *before* the
/// move (per `sbrk`'s contract) or `None` if the kernel refused (`sbrk` returns `(void*) -1`).
unsafe fn sbrk_extend(amount: usize) -> Option<*mut u8> {
	unsafe {
		let old_break = libc::sbrk(amount as libc::intptr_t);
		if old_break as isize == -1 {
			None
		} else {
			Some(old_break as *mut u8)
		}
	}
}

/// Grows the heap to satisfy an allocation of at least `m` usable payload bytes, returning an
/// unlinked free block of at least that size. `latest` is updated in place whenever a fresh
/// chunk descriptor is minted.
///
/// Follows the reference algorithm exactly: request `max(request_size, MIN_CHUNK)` bytes first,
/// retry with just `request_size` if that fails and `MIN_CHUNK` was the larger of the two, then
/// only *after* the grant is in hand, decide whether it continues the latest chunk or starts a
/// new one.
///
/// # Safety
/// `*latest` must be null or point at the most recently acquired chunk; `buckets` must be in a
/// consistent state.
pub(crate) unsafe fn grow(
	latest: &mut *mut ChunkHeader,
	buckets: &mut BucketTable,
	m: usize,
) -> Option<*mut BlockHeader> {
	unsafe {
		// Step 1: round `m` up to A, add a full A of slack for a possibly-unaligned grant, then
		// the header+footer and chunk-descriptor overhead.
		let request_size = align_up(m) + A + BLOCK_OVERHEAD + CHUNK_HEADER_SIZE;

		// Step 2: try the larger of the two, retry with the smaller on failure.
		let primary = request_size.max(MIN_CHUNK);
		let (granted, raw_start) = match sbrk_extend(primary) {
			Some(raw) => (primary, raw),
			None if primary > request_size => (request_size, sbrk_extend(request_size)?),
			None => return None,
		};

		// Step 3: align the grant inward; the raw break need not be A-aligned.
		let raw_start = raw_start as usize;
		let raw_end = raw_start + granted;
		let start = align_up(raw_start);
		let end = align_down(raw_end);
		let usable = end - start;
		debug_assert!(
			usable >= request_size,
			"chunk grant smaller than requested after alignment"
		);
		debug_assert_eq!(usable % A, 0);

		// Step 4: contiguous-extension test against the most recently acquired chunk.
		let prev_chunk = *latest;
		if !prev_chunk.is_null() {
			let prev_end = (prev_chunk as *mut u8).add((*prev_chunk).size);
			if prev_end as usize == start {
				(*prev_chunk).size += usable;
				let last = last_block_of(prev_chunk);

				if !BlockHeader::is_allocated(last) {
					buckets.unlink(last);
					let new_size = BlockHeader::size(last) + usable;
					BlockHeader::set_size(last, new_size);
					BlockHeader::set_has_physical_next(last, false);
					return Some(last);
				}

				BlockHeader::set_has_physical_next(last, true);
				let new_block: *mut BlockHeader = (start as *mut u8).cast();
				BlockHeader::init(new_block);
				BlockHeader::set_has_physical_prev(new_block, true);
				BlockHeader::set_size(new_block, usable - BLOCK_OVERHEAD);
				BlockHeader::set_has_physical_next(new_block, false);
				return Some(new_block);
			}
		}

		// Step 5: no contiguous predecessor — mint a fresh chunk descriptor and a single free
		// block spanning the remainder.
		let chunk: *mut ChunkHeader = (start as *mut u8).cast();
		(*chunk).prev = *latest;
		(*chunk).size = usable;
		*latest = chunk;

		let block: *mut BlockHeader = (start as *mut u8).add(CHUNK_HEADER_SIZE).cast();
		BlockHeader::init(block);
		BlockHeader::set_has_physical_prev(block, false);
		BlockHeader::set_size(block, usable - CHUNK_HEADER_SIZE - BLOCK_OVERHEAD);
		BlockHeader::set_has_physical_next(block, false);
		Some(block)
	}
}

/// The chunk acquired just before `chunk`, or null if `chunk` is the oldest one. Used only for
/// diagnostics (walking the chunk stack to count chunks).
pub(crate) unsafe fn prev_of(chunk: *mut ChunkHeader) -> *mut ChunkHeader {
	unsafe { (*chunk).prev }
}

/// Whether `addr` falls within any chunk reachable from `latest`. Used to validate pointers
/// handed back to `free`/`reallocate`, and to implement [`crate::chain::ChainableAlloc`].
pub(crate) unsafe fn addr_in_bounds(latest: *mut ChunkHeader, addr: usize) -> bool {
	unsafe {
		let mut chunk = latest;
		while !chunk.is_null() {
			let start = chunk as usize;
			let end = start + (*chunk).size;
			if addr >= start && addr < end {
				return true;
			}
			chunk = (*chunk).prev;
		}
		false
	}
}
