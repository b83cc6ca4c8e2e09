//! On-heap metadata for a single allocation unit: a header, a payload region, and a footer.
//!
//! Every stored size and pointer is word-pair aligned (a multiple of [`A`]), which leaves the low
//! bit of each free to carry a flag. `size` fields always go through [`mask`] on read; writers
//! must re-apply whichever flag bit they captured before overwriting. The three flags are:
//!
//! - `allocated`: low bit of `header.prev_free`.
//! - `has_physical_prev`: low bit of `header.size`.
//! - `has_physical_next`: low bit of `footer.size`.
//!
//! A block that is not currently linked into any bucket carries a self-pointer in
//! `prev_free` (masked) as a sentinel; see [`BlockHeader::is_linked`].

use core::ptr;

use crate::align::Align;

/// Word-pair alignment enforced on every block header, footer, chunk descriptor, and payload
/// size. Matches the system's 64-bit ABI alignment requirement.
pub const A: usize = 16;

#[inline]
pub(crate) const fn align_up(n: usize) -> usize {
	(n + A - 1) / A * A
}

#[inline]
pub(crate) const fn align_down(n: usize) -> usize {
	n / A * A
}

#[inline]
fn mask(v: usize) -> usize {
	v & !1usize
}

#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct BlockHeader {
	pub(crate) prev_free: *mut BlockHeader,
	pub(crate) next_free: *mut BlockHeader,
	size: usize,
	_pad: usize,
	_align: Align<A>,
}

#[repr(C)]
pub(crate) struct BlockFooter {
	_pad: usize,
	size: usize,
	_align: Align<A>,
}

pub(crate) const HEADER_SIZE: usize = core::mem::size_of::<BlockHeader>();
pub(crate) const FOOTER_SIZE: usize = core::mem::size_of::<BlockFooter>();
pub(crate) const BLOCK_OVERHEAD: usize = HEADER_SIZE + FOOTER_SIZE;

const _: () = {
	assert!(HEADER_SIZE % A == 0);
	assert!(FOOTER_SIZE % A == 0);
	assert!(BLOCK_OVERHEAD % A == 0);
};

impl BlockHeader {
	/// A header value with no flags set and no established physical neighbors. Used both to
	/// seed bucket sentinels and, via [`BlockHeader::init`], to birth new blocks.
	pub(crate) const fn sentinel() -> Self {
		BlockHeader {
			prev_free: ptr::null_mut(),
			next_free: ptr::null_mut(),
			size: 0,
			_pad: 0,
			_align: Align::new(),
		}
	}

	/// Initializes a freshly-carved block at `this`: not linked into any bucket, not allocated,
	/// payload size zero, no physical neighbors. The caller must call [`set_size`] and the
	/// physical-adjacency setters before the block is observable by anyone else.
	///
	/// [`set_size`]: BlockHeader::set_size
	///
	/// # Safety
	/// `this` must be valid for writes of a `BlockHeader`.
	pub(crate) unsafe fn init(this: *mut BlockHeader) {
		unsafe {
			(*this).next_free = ptr::null_mut();
			(*this).size = 0;
			(*this)._pad = 0;
			// Self-pointer is the "not linked" sentinel; see `is_linked`. It is also an even
			// address, so this clears the allocated flag too.
			(*this).prev_free = this;
		}
	}

	#[inline]
	pub(crate) unsafe fn size(this: *mut BlockHeader) -> usize {
		unsafe { mask((*this).size) }
	}

	#[inline]
	pub(crate) unsafe fn has_physical_prev(this: *mut BlockHeader) -> bool {
		unsafe { (*this).size & 1 != 0 }
	}

	pub(crate) unsafe fn set_has_physical_prev(this: *mut BlockHeader, has: bool) {
		unsafe {
			let s = mask((*this).size);
			(*this).size = if has { s | 1 } else { s };
		}
	}

	#[inline]
	pub(crate) unsafe fn has_physical_next(this: *mut BlockHeader) -> bool {
		unsafe { (*Self::footer(this)).size & 1 != 0 }
	}

	pub(crate) unsafe fn set_has_physical_next(this: *mut BlockHeader, has: bool) {
		unsafe {
			let footer = Self::footer(this);
			let s = mask((*footer).size);
			(*footer).size = if has { s | 1 } else { s };
		}
	}

	#[inline]
	pub(crate) unsafe fn is_allocated(this: *mut BlockHeader) -> bool {
		unsafe { (*this).prev_free.addr() & 1 != 0 }
	}

	pub(crate) unsafe fn set_allocated(this: *mut BlockHeader, allocated: bool) {
		unsafe {
			let p = (*this).prev_free;
			(*this).prev_free = if allocated {
				p.map_addr(|a| a | 1)
			} else {
				p.map_addr(|a| a & !1)
			};
		}
	}

	/// `prev_free` with the allocated-flag bit stripped, safe to dereference as a real pointer
	/// (either another block, a bucket sentinel, or `this` itself when unlinked).
	#[inline]
	pub(crate) unsafe fn masked_prev(this: *mut BlockHeader) -> *mut BlockHeader {
		unsafe { (*this).prev_free.map_addr(|a| a & !1) }
	}

	/// Whether `this` is currently spliced into a bucket's free-list.
	#[inline]
	pub(crate) unsafe fn is_linked(this: *mut BlockHeader) -> bool {
		unsafe { Self::masked_prev(this) != this }
	}

	/// Marks `this` as not linked into any bucket. Only ever called on blocks that are already
	/// free (unallocated blocks are the only ones a bucket ever holds), so there is no allocated
	/// flag to preserve.
	pub(crate) unsafe fn mark_unlinked(this: *mut BlockHeader) {
		unsafe {
			debug_assert!(!Self::is_allocated(this));
			(*this).prev_free = this;
			(*this).next_free = ptr::null_mut();
		}
	}

	pub(crate) unsafe fn footer(this: *mut BlockHeader) -> *mut BlockFooter {
		unsafe {
			(this as *mut u8)
				.add(HEADER_SIZE + Self::size(this))
				.cast()
		}
	}

	pub(crate) unsafe fn payload(this: *mut BlockHeader) -> *mut u8 {
		unsafe { (this as *mut u8).add(HEADER_SIZE) }
	}

	pub(crate) unsafe fn header_from_payload(p: *mut u8) -> *mut BlockHeader {
		unsafe { p.sub(HEADER_SIZE).cast() }
	}

	/// Writes `s` into both header and footer size fields. Preserves `has_physical_prev`.
	/// Does **not** touch `has_physical_next` — the footer may have just moved, so the caller
	/// must re-apply whatever that flag should be afterward.
	pub(crate) unsafe fn set_size(this: *mut BlockHeader, s: usize) {
		unsafe {
			debug_assert_eq!(s % A, 0);
			let had_prev = Self::has_physical_prev(this);
			(*this).size = if had_prev { s | 1 } else { s };
			let footer = Self::footer(this);
			(*footer).size = s;
		}
	}

	/// The physically-adjacent block immediately after `this` in the same chunk, if any.
	pub(crate) unsafe fn physical_next(this: *mut BlockHeader) -> Option<*mut BlockHeader> {
		unsafe {
			if Self::has_physical_next(this) {
				let footer = Self::footer(this);
				Some((footer as *mut u8).add(FOOTER_SIZE).cast())
			} else {
				None
			}
		}
	}

	/// The physically-adjacent block immediately before `this` in the same chunk, if any.
	pub(crate) unsafe fn physical_prev(this: *mut BlockHeader) -> Option<*mut BlockHeader> {
		unsafe {
			if Self::has_physical_prev(this) {
				let prev_footer: *mut BlockFooter = (this as *mut u8).sub(FOOTER_SIZE).cast();
				let prev_size = mask((*prev_footer).size);
				let prev_header = (prev_footer as *mut u8).sub(HEADER_SIZE + prev_size);
				Some(prev_header.cast())
			} else {
				None
			}
		}
	}
}
