//! The single-threaded allocator core: wires the Size Classifier, Bucket Table, Chunk Allocator,
//! Splitter and Coalescer together behind the four public-facade operations.

use core::cell::UnsafeCell;
use core::fmt::{self, Debug, Formatter};
use core::ptr::{self, NonNull};

#[cfg(any(feature = "allocator-api", feature = "allocator-api2"))]
use crate::alloc::{AllocError, Allocator, Layout};

use crate::block::{align_up, BlockHeader, A};
use crate::bucket::BucketTable;
use crate::chunk::{self, ChunkHeader};
use crate::classify::N;
use crate::coalesce;
use crate::split;

/// A general-purpose, single-threaded heap that services allocations from memory obtained
/// incrementally through the OS program-break primitive.
///
/// `Heap` uses interior mutability so its methods take `&self`, the same way [`crate::UnsafeHeap`]
/// and [`crate::SyncHeap`] wrap it — this type on its own is **not** `Sync`; see those wrappers
/// for ways to share a `Heap` across threads.
pub struct Heap {
	buckets: UnsafeCell<BucketTable>,
	latest_chunk: UnsafeCell<*mut ChunkHeader>,
}

impl Heap {
	/// Creates an empty heap. No memory is requested from the OS until the first allocation.
	pub const fn new() -> Self {
		Heap {
			buckets: UnsafeCell::new(BucketTable::new()),
			latest_chunk: UnsafeCell::new(ptr::null_mut()),
		}
	}

	/// Allocates at least `n` bytes, aligned to [`A`]. Returns null (with no error signaled) if
	/// `n == 0`, and also returns null if the OS cannot grant enough additional program-break
	/// space to satisfy the request.
	pub fn allocate(&self, n: usize) -> *mut u8 {
		if n == 0 {
			return ptr::null_mut();
		}
		self.raw_alloc(n)
	}

	/// Equivalent to `allocate(count * unit)` followed by a zero-fill of the payload. Returns
	/// null if `count == 0`, `unit == 0`, or the product overflows `usize`.
	pub fn cleared_allocate(&self, count: usize, unit: usize) -> *mut u8 {
		if count == 0 || unit == 0 {
			return ptr::null_mut();
		}
		let Some(n) = count.checked_mul(unit) else {
			return ptr::null_mut();
		};
		let p = self.raw_alloc(n);
		if !p.is_null() {
			unsafe { ptr::write_bytes(p, 0, n) };
		}
		p
	}

	/// If `p` is null, equivalent to `allocate(new_n)`. If `new_n` is zero, frees `p` and
	/// returns a dangling, zero-length, `A`-aligned pointer (never null), mirroring how a
	/// zero-size `Layout` is handled elsewhere in this facade. Otherwise allocates a new block,
	/// copies `min(capacity(p), new_n)` bytes over, frees `p`, and returns the new pointer. On
	/// allocation failure, `p` is left intact and null is returned.
	///
	/// # Safety
	/// `p` must be null or a pointer previously returned by this heap's `allocate`,
	/// `cleared_allocate`, or `reallocate`, and not yet freed.
	pub unsafe fn reallocate(&self, p: *mut u8, new_n: usize) -> *mut u8 {
		unsafe {
			if p.is_null() {
				return self.allocate(new_n);
			}
			if new_n == 0 {
				self.free(p);
				return A as *mut u8;
			}

			let header = BlockHeader::header_from_payload(p);
			let old_size = BlockHeader::size(header);

			let new_p = self.raw_alloc(new_n);
			if new_p.is_null() {
				return ptr::null_mut();
			}

			ptr::copy_nonoverlapping(p, new_p, old_size.min(new_n));
			self.free(p);
			new_p
		}
	}

	/// Frees `p`. A no-op if `p` is null.
	///
	/// # Safety
	/// `p` must be null or a pointer previously returned by this heap's `allocate`,
	/// `cleared_allocate`, or `reallocate`, and not yet freed.
	pub unsafe fn free(&self, p: *mut u8) {
		unsafe {
			if p.is_null() {
				return;
			}
			self.raw_free(p);
		}
	}

	/// Core of `allocate`/`cleared_allocate`/`reallocate`: Classifier → Bucket Table search →
	/// (miss) Chunk Allocator → Splitter → mark allocated → return payload pointer.
	fn raw_alloc(&self, n: usize) -> *mut u8 {
		unsafe {
			let size = align_up(n);
			let buckets = &mut *self.buckets.get();

			let block = match buckets.find_fit(size) {
				Some(b) => b,
				None => {
					let latest = &mut *self.latest_chunk.get();
					match chunk::grow(latest, buckets, size) {
						Some(b) => b,
						None => {
							log::debug!("heap: out of memory requesting {size} bytes");
							return ptr::null_mut();
						}
					}
				}
			};

			split::split(buckets, block, size);
			BlockHeader::set_allocated(block, true);

			let payload = BlockHeader::payload(block);
			log::trace!("heap: allocate({n}) returning {payload:p}");
			payload
		}
	}

	/// Core of `free`: locate header from payload pointer → Coalescer → Bucket Table insertion.
	///
	/// # Safety
	/// `p` must be a live payload pointer returned by this heap.
	unsafe fn raw_free(&self, p: *mut u8) {
		unsafe {
			let header = BlockHeader::header_from_payload(p);
			debug_assert!(
				BlockHeader::is_allocated(header),
				"Corruption: free() called on a block that isn't marked allocated (double free?)"
			);

			BlockHeader::set_allocated(header, false);
			let buckets = &mut *self.buckets.get();
			let merged = coalesce::coalesce(buckets, header);
			buckets.insert(merged);
			log::trace!("heap: free({p:p})");
		}
	}

	/// Whether `addr` falls inside any chunk this heap has ever acquired from the OS.
	pub(crate) fn addr_in_bounds(&self, addr: usize) -> bool {
		unsafe { chunk::addr_in_bounds(*self.latest_chunk.get(), addr) }
	}

	/// Number of free blocks currently linked in each bucket. Exposed crate-wide for white-box
	/// tests of the bucket-membership and sorted-insertion invariants.
	#[cfg(test)]
	pub(crate) fn bucket_counts(&self) -> [usize; N] {
		unsafe { (*self.buckets.get()).debug_counts() }
	}

	/// Number of chunks acquired from the OS so far. Exposed crate-wide for tests of the chunk
	/// growth protocol (both contiguous chunk extension and fresh chunk acquisition).
	#[cfg(test)]
	pub(crate) fn chunk_count(&self) -> usize {
		let mut chunk = unsafe { *self.latest_chunk.get() };
		let mut n = 0;
		while !chunk.is_null() {
			n += 1;
			chunk = unsafe { chunk::prev_of(chunk) };
		}
		n
	}
}

impl Default for Heap {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for Heap {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		writeln!(f, "Heap:")?;
		let counts = unsafe { (*self.buckets.get()).debug_counts() };
		for (idx, count) in counts.iter().enumerate() {
			if *count > 0 {
				writeln!(f, "\tbucket {idx}: {count} free block(s)")?;
			}
		}
		if counts.iter().all(|c| *c == 0) {
			writeln!(f, "\t(no free blocks)")?;
		}

		let mut chunk = unsafe { *self.latest_chunk.get() };
		if chunk.is_null() {
			return writeln!(f, "\t(no chunks acquired yet)");
		}
		let mut n = 0;
		while !chunk.is_null() {
			n += 1;
			chunk = unsafe { chunk::prev_of(chunk) };
		}
		writeln!(f, "\t{n} chunk(s) acquired from the OS")
	}
}

#[cfg(any(feature = "allocator-api", feature = "allocator-api2"))]
unsafe impl Allocator for Heap {
	fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
		// Oversized alignment isn't honored; see the crate's Non-goals.
		if layout.align() > A {
			return Err(AllocError);
		}

		if layout.size() == 0 {
			let dangling = unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
			return Ok(NonNull::slice_from_raw_parts(dangling, 0));
		}

		let p = self.raw_alloc(layout.size());
		NonNull::new(p)
			.map(|p| NonNull::slice_from_raw_parts(p, layout.size()))
			.ok_or(AllocError)
	}

	unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
		if layout.size() == 0 {
			return;
		}
		unsafe { self.raw_free(ptr.as_ptr()) };
	}

	fn by_ref(&self) -> &Self
	where
		Self: Sized,
	{
		self
	}
}

// `Allocator`'s default `allocate_zeroed`/`grow`/`grow_zeroed`/`shrink` (allocate new, copy,
// deallocate old) are kept as-is: the segregated-fit core has no cheap in-place grow path the
// way the fixed-array core did, so there's nothing to special-case here.

const _: () = assert!(N > 0);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn allocate_zero_returns_null() {
		let heap = Heap::new();
		assert!(heap.allocate(0).is_null());
	}

	#[test]
	fn free_null_is_noop() {
		let heap = Heap::new();
		unsafe { heap.free(ptr::null_mut()) };
	}

	#[test]
	fn reallocate_null_is_allocate() {
		let heap = Heap::new();
		let p = unsafe { heap.reallocate(ptr::null_mut(), 24) };
		assert!(!p.is_null());
		assert_eq!(p.addr() % A, 0);
	}

	#[test]
	fn cleared_allocate_zeroes_payload() {
		let heap = Heap::new();
		let p = heap.cleared_allocate(8, 4);
		assert!(!p.is_null());
		let bytes = unsafe { core::slice::from_raw_parts(p, 32) };
		assert!(bytes.iter().all(|&b| b == 0));
	}

	#[test]
	fn cold_allocate_rounds_up_and_aligns() {
		let heap = Heap::new();
		let p = heap.allocate(24);
		assert!(!p.is_null());
		assert_eq!(p.addr() % A, 0);
	}

	#[test]
	fn free_and_reuse_returns_same_pointer() {
		let heap = Heap::new();
		let p1 = heap.allocate(24);
		unsafe { heap.free(p1) };
		let p2 = heap.allocate(24);
		assert_eq!(p1, p2);
	}

	#[test]
	fn reallocate_preserves_prefix() {
		let heap = Heap::new();
		let p = heap.allocate(10);
		let bytes: [u8; 10] = core::array::from_fn(|i| i as u8);
		unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), p, 10) };

		let grown = unsafe { heap.reallocate(p, 1000) };
		assert!(!grown.is_null());
		let grown_bytes = unsafe { core::slice::from_raw_parts(grown, 10) };
		assert_eq!(grown_bytes, &bytes);
	}
}
