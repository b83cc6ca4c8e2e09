//! The segregated free-list index: [`N`](crate::classify::N) sentinel heads, each anchoring a
//! doubly-linked, ascending-size-sorted free-list of [`BlockHeader`]s.

use crate::block::BlockHeader;
use crate::classify::{bucket_index, N};

pub(crate) struct BucketTable {
	heads: [BlockHeader; N],
}

impl BucketTable {
	pub(crate) const fn new() -> Self {
		Self {
			heads: [BlockHeader::sentinel(); N],
		}
	}

	fn anchor(&mut self, idx: usize) -> *mut BlockHeader {
		&mut self.heads[idx]
	}

	/// Splices `block` in immediately after `anchor` in whatever list `anchor` belongs to.
	/// Clears `block`'s allocated bit as a side effect, since a linked block is always free
	/// (`anchor` is always a real, even-aligned address, so this falls out of the pointer write
	/// rather than needing an explicit flag clear).
	///
	/// # Safety
	/// `anchor` must be a live sentinel or block header; `block` must not currently be linked.
	unsafe fn link_after(anchor: *mut BlockHeader, block: *mut BlockHeader) {
		unsafe {
			let old_next = (*anchor).next_free;
			(*block).prev_free = anchor;
			(*block).next_free = old_next;
			if !old_next.is_null() {
				(*old_next).prev_free = block;
			}
			(*anchor).next_free = block;
		}
	}

	/// Splices `block` out of its current list. Idempotent: a no-op if `block` isn't linked.
	///
	/// # Safety
	/// `block` must be a live block header (or already-unlinked, in which case this is a no-op).
	pub(crate) unsafe fn unlink(&mut self, block: *mut BlockHeader) {
		unsafe {
			if !BlockHeader::is_linked(block) {
				return;
			}
			let prev = BlockHeader::masked_prev(block);
			let next = (*block).next_free;
			(*prev).next_free = next;
			if !next.is_null() {
				(*next).prev_free = prev;
			}
			BlockHeader::mark_unlinked(block);
		}
	}

	/// Inserts `block` into the bucket selected by its masked size, keeping the bucket sorted
	/// ascending by size so that first-fit within a bucket is also best-fit.
	///
	/// # Safety
	/// `block` must not currently be linked, and must carry a valid size.
	pub(crate) unsafe fn insert(&mut self, block: *mut BlockHeader) {
		unsafe {
			let size = BlockHeader::size(block);
			let idx = bucket_index(size);
			let mut prev = self.anchor(idx);
			loop {
				let next = (*prev).next_free;
				if next.is_null() || BlockHeader::size(next) >= size {
					break;
				}
				prev = next;
			}
			Self::link_after(prev, block);
		}
	}

	/// Finds the first free block whose masked size is at least `size`, scanning buckets from
	/// the smallest sufficient bucket upward and stopping at the first match (first-fit within
	/// the smallest sufficient bucket, never falling through to a larger bucket once one is
	/// found). The returned block has already been unlinked from its bucket.
	///
	/// # Safety
	/// The table must be in a consistent state (see the struct-level invariants).
	pub(crate) unsafe fn find_fit(&mut self, size: usize) -> Option<*mut BlockHeader> {
		unsafe {
			let start = bucket_index(size);
			for idx in start..N {
				let mut curr = (*self.anchor(idx)).next_free;
				while !curr.is_null() {
					if BlockHeader::size(curr) >= size {
						self.unlink(curr);
						return Some(curr);
					}
					curr = (*curr).next_free;
				}
			}
			None
		}
	}

	/// Number of free blocks currently linked in each bucket, for diagnostics.
	pub(crate) fn debug_counts(&self) -> [usize; N] {
		let mut counts = [0usize; N];
		for (idx, count) in counts.iter_mut().enumerate() {
			let mut curr = self.heads[idx].next_free;
			while !curr.is_null() {
				*count += 1;
				curr = unsafe { (*curr).next_free };
			}
		}
		counts
	}
}
