//! A `Sync` wrapper around [`Heap`] for single-threaded programs that want to install it as
//! `#[global_allocator]` without paying for a mutex.

use core::fmt::{self, Debug, Formatter};
use core::ops::Deref;
use core::ptr::{self, NonNull};

use crate::block::A;
use crate::chain::ChainableAlloc;
use crate::heap::Heap;

#[cfg(any(feature = "allocator-api", feature = "allocator-api2"))]
use crate::alloc::{AllocError, Allocator, Layout};

/// A wrapper around [`Heap`] that implements `Sync` and `GlobalAlloc`.
///
/// This type is unsafe to create because it does not prevent data races: the segregated free-list
/// engine assumes single-threaded access. It is strongly recommended to use
/// [`UnsafeHeap`] only in genuinely single-threaded programs; use [`crate::SyncHeap`] otherwise.
pub struct UnsafeHeap {
	inner: Heap,
}

impl UnsafeHeap {
	/// # Safety
	/// `UnsafeHeap` does not prevent data races. It is strongly recommended to only use it in a
	/// single-threaded environment.
	pub const unsafe fn new() -> Self {
		Self { inner: Heap::new() }
	}
}

impl Deref for UnsafeHeap {
	type Target = Heap;

	fn deref(&self) -> &Self::Target {
		&self.inner
	}
}

impl Debug for UnsafeHeap {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", self.inner)
	}
}

impl Default for UnsafeHeap {
	fn default() -> Self {
		// SAFETY: `Default::default` carries the same single-threaded obligation as `new`.
		unsafe { Self::new() }
	}
}

// SAFETY: the caller of `UnsafeHeap::new` promised single-threaded access.
unsafe impl Sync for UnsafeHeap {}

// SAFETY: `addr_in_bounds` defers to `Heap::addr_in_bounds`, which walks the live chunk stack.
unsafe impl ChainableAlloc for UnsafeHeap {
	fn addr_in_bounds(&self, addr: usize) -> bool {
		self.inner.addr_in_bounds(addr)
	}
}

unsafe impl core::alloc::GlobalAlloc for UnsafeHeap {
	unsafe fn alloc(&self, layout: core::alloc::Layout) -> *mut u8 {
		if layout.align() > A {
			return ptr::null_mut();
		}
		self.inner.allocate(layout.size())
	}

	unsafe fn alloc_zeroed(&self, layout: core::alloc::Layout) -> *mut u8 {
		if layout.align() > A {
			return ptr::null_mut();
		}
		self.inner.cleared_allocate(1, layout.size())
	}

	unsafe fn dealloc(&self, ptr: *mut u8, _layout: core::alloc::Layout) {
		// SAFETY: upheld by the caller.
		unsafe { self.inner.free(ptr) }
	}

	unsafe fn realloc(&self, ptr: *mut u8, _layout: core::alloc::Layout, new_size: usize) -> *mut u8 {
		// SAFETY: upheld by the caller.
		unsafe { self.inner.reallocate(ptr, new_size) }
	}
}

#[cfg(any(feature = "allocator-api", feature = "allocator-api2"))]
unsafe impl Allocator for UnsafeHeap {
	fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
		// `Heap` also has an inherent `allocate(&self, n: usize)` matching the raw C-like
		// four-operation surface, so the trait method must be called by its fully qualified name.
		Allocator::allocate(&self.inner, layout)
	}

	unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
		// SAFETY: upheld by the caller.
		unsafe { self.inner.deallocate(ptr, layout) }
	}

	fn by_ref(&self) -> &Self
	where
		Self: Sized,
	{
		self
	}
}
