//! A `Mutex`-guarded wrapper around [`Heap`] for multi-threaded programs.

use core::fmt::{self, Debug, Formatter};
use core::ptr;
use std::sync::{Mutex, MutexGuard};

use crate::block::A;
use crate::chain::ChainableAlloc;
use crate::heap::Heap;

#[cfg(any(feature = "allocator-api", feature = "allocator-api2"))]
use crate::alloc::{AllocError, Allocator, Layout};
#[cfg(any(feature = "allocator-api", feature = "allocator-api2"))]
use core::ptr::NonNull;

/// A wrapper around [`Heap`] that is safe to share across threads because every access goes
/// through a `Mutex`. Slower than [`crate::UnsafeHeap`] but requires no safety obligation from
/// the caller.
pub struct SyncHeap {
	inner: Mutex<Heap>,
}

impl SyncHeap {
	pub const fn new() -> Self {
		Self {
			inner: Mutex::new(Heap::new()),
		}
	}

	fn lock(&self) -> MutexGuard<'_, Heap> {
		// A panic inside a locked section is already undefined behavior under this allocator's
		// single-threaded corruption model (release builds elide the assertions that would catch
		// it), so a poisoned mutex can't happen in practice.
		unsafe { self.inner.lock().unwrap_unchecked() }
	}
}

impl Default for SyncHeap {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for SyncHeap {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", *self.lock())
	}
}

unsafe impl ChainableAlloc for SyncHeap {
	fn addr_in_bounds(&self, addr: usize) -> bool {
		self.lock().addr_in_bounds(addr)
	}
}

unsafe impl core::alloc::GlobalAlloc for SyncHeap {
	unsafe fn alloc(&self, layout: core::alloc::Layout) -> *mut u8 {
		if layout.align() > A {
			return ptr::null_mut();
		}
		self.lock().allocate(layout.size())
	}

	unsafe fn alloc_zeroed(&self, layout: core::alloc::Layout) -> *mut u8 {
		if layout.align() > A {
			return ptr::null_mut();
		}
		self.lock().cleared_allocate(1, layout.size())
	}

	unsafe fn dealloc(&self, ptr: *mut u8, _layout: core::alloc::Layout) {
		// SAFETY: upheld by the caller.
		unsafe { self.lock().free(ptr) }
	}

	unsafe fn realloc(&self, ptr: *mut u8, _layout: core::alloc::Layout, new_size: usize) -> *mut u8 {
		// SAFETY: upheld by the caller.
		unsafe { self.lock().reallocate(ptr, new_size) }
	}
}

#[cfg(any(feature = "allocator-api", feature = "allocator-api2"))]
unsafe impl Allocator for SyncHeap {
	fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
		// `Heap` also has an inherent `allocate(&self, n: usize)` matching the raw C-like
		// four-operation surface, so the trait method must be called by its fully qualified name.
		Allocator::allocate(&*self.lock(), layout)
	}

	unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
		// SAFETY: upheld by the caller.
		unsafe { self.lock().deallocate(ptr, layout) }
	}

	fn by_ref(&self) -> &Self
	where
		Self: Sized,
	{
		self
	}
}
