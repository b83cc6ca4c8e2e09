//! Carving a smaller block out of the front of a larger free block.

use crate::block::{BlockHeader, A, BLOCK_OVERHEAD, FOOTER_SIZE};
use crate::bucket::BucketTable;

/// Splits `block` so that its payload becomes exactly `s` bytes, bucketing the free remainder.
///
/// If the leftover after carving `s` bytes plus one block's worth of overhead would be zero or
/// negative, this does nothing and the caller gets the whole block — there isn't enough room
/// left over to host another block's metadata. Otherwise:
///
/// 1. Capture `block`'s `has_physical_next`.
/// 2. Shrink `block` to size `s` (the footer moves leftward).
/// 3. Mint a new free block right after `block`'s new footer, with the leftover payload,
///    `has_physical_prev = true`, and `has_physical_next` = the captured value.
/// 4. Set `block`'s `has_physical_next = true`.
/// 5. Bucket the new block.
///
/// `block` itself is left unlinked — the caller is about to mark it allocated.
///
/// # Safety
/// `block` must not be linked into any bucket, `s` must be aligned to `A`, and `s` must not
/// exceed `block`'s masked size.
pub(crate) unsafe fn split(buckets: &mut BucketTable, block: *mut BlockHeader, s: usize) {
	unsafe {
		debug_assert_eq!(s % A, 0);
		let total = BlockHeader::size(block);
		debug_assert!(total >= s);

		if total <= s + BLOCK_OVERHEAD {
			return;
		}

		let had_next = BlockHeader::has_physical_next(block);
		let leftover = total - s - BLOCK_OVERHEAD;

		BlockHeader::set_size(block, s);

		let new_block: *mut BlockHeader =
			(BlockHeader::footer(block) as *mut u8).add(FOOTER_SIZE).cast();
		BlockHeader::init(new_block);
		BlockHeader::set_has_physical_prev(new_block, true);
		BlockHeader::set_size(new_block, leftover);
		BlockHeader::set_has_physical_next(new_block, had_next);

		BlockHeader::set_has_physical_next(block, true);

		buckets.insert(new_block);
	}
}
