//! Fusing a freshly-freed block with its free physical neighbors.

use crate::block::{BlockHeader, BLOCK_OVERHEAD};
use crate::bucket::BucketTable;

/// Fuses `node` with its immediate physical successor, if that successor exists and is free.
/// `node`'s `has_physical_prev` is preserved automatically by [`BlockHeader::set_size`]; the
/// absorbed successor's `has_physical_next` becomes `node`'s new `has_physical_next`.
///
/// Used both for forward fusion (`node` is the just-freed block) and, by the backward fusion
/// step below, for fusing a free predecessor with `node` acting as its "next" — the same
/// merge, just anchored at the other block.
///
/// # Safety
/// `node` must be a live, unlinked block header.
unsafe fn merge_forward(buckets: &mut BucketTable, node: *mut BlockHeader) {
	unsafe {
		let Some(next) = BlockHeader::physical_next(node) else {
			return;
		};
		if BlockHeader::is_allocated(next) {
			return;
		}

		buckets.unlink(next);
		let final_has_next = BlockHeader::has_physical_next(next);
		let combined = BlockHeader::size(node) + BlockHeader::size(next) + BLOCK_OVERHEAD;
		BlockHeader::set_size(node, combined);
		BlockHeader::set_has_physical_next(node, final_has_next);
	}
}

/// Fuses `block` — freshly freed and not linked into any bucket — with its free physical
/// neighbors. Fuses forward first, then backward; backward fusion reuses [`merge_forward`] with
/// the predecessor as the anchor, which also absorbs anything `block` already grew into.
///
/// Returns the resulting maximal free block, still unlinked, ready for the caller to insert.
///
/// # Safety
/// `block` must be a live, unlinked block header that has just been marked free.
pub(crate) unsafe fn coalesce(buckets: &mut BucketTable, block: *mut BlockHeader) -> *mut BlockHeader {
	unsafe {
		let mut b = block;
		merge_forward(buckets, b);

		if let Some(prev) = BlockHeader::physical_prev(b) {
			if !BlockHeader::is_allocated(prev) {
				buckets.unlink(prev);
				merge_forward(buckets, prev);
				b = prev;
			}
		}

		b
	}
}
