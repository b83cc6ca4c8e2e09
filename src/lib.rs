#![cfg_attr(feature = "allocator-api", feature(allocator_api))]
//! A general-purpose, single-threaded heap allocator that services allocations from memory
//! obtained incrementally through the OS program-break primitive (`sbrk`).
//!
//! The crate is organized around the segregated free-list engine described by the allocator's
//! design document, leaf modules first:
//!
//! - [`classify`] — maps a payload size to one of [`classify::N`] free-list bucket indices.
//! - [`block`] — on-heap header/payload/footer layout and its packed flags.
//! - [`chunk`] — acquiring memory from the OS program break, incrementally.
//! - [`bucket`] — the segregated free-list index ([`bucket::BucketTable`]).
//! - [`split`] / [`coalesce`] — carving a block on allocation, fusing free neighbors on release.
//! - [`heap`] — [`Heap`], which wires the above together behind the four public operations.
//!
//! [`Heap`] is not `Sync` (it uses interior mutability and assumes single-threaded access, per
//! the allocator's concurrency model). Two wrappers make it shareable:
//!
//! - [`UnsafeHeap`] — `unsafe` to construct, `Sync` by fiat; for programs that are already
//!   single-threaded and don't want to pay for a mutex.
//! - [`SyncHeap`] — a `Mutex`-guarded wrapper, safe to construct, usable from any thread.
//!
//! Both wrappers implement [`core::alloc::GlobalAlloc`] (install with `#[global_allocator]`) and,
//! with the `allocator-api` or `allocator-api2` feature enabled, the `Allocator` trait (for use
//! with `Vec::new_in`, `Box::new_in`, etc). [`AllocChain`] lets either wrapper be chained in front
//! of a fallback allocator such as `std::alloc::System`.

mod align;
mod alloc;
mod block;
mod bucket;
mod chain;
mod chunk;
mod classify;
mod coalesce;
mod heap;
mod split;
mod syncheap;
mod unsafeheap;

#[cfg(test)]
mod tests;

pub use alloc::AllocError;
#[cfg(any(feature = "allocator-api", feature = "allocator-api2"))]
pub use alloc::{Allocator, Layout};
pub use block::A;
pub use chain::{AllocChain, ChainableAlloc};
pub use chunk::MIN_CHUNK;
pub use classify::{FIRST_BUCKET_CEILING, N};
pub use heap::Heap;
pub use syncheap::SyncHeap;
pub use unsafeheap::UnsafeHeap;
