//! Global allocator selection: jemalloc on unix when the `jemalloc` feature is enabled,
//! the system allocator otherwise.

#[cfg(all(feature = "jemalloc", unix))]
type AllocatorInner = tikv_jemallocator::Jemalloc;
#[cfg(not(all(feature = "jemalloc", unix)))]
type AllocatorInner = std::alloc::System;

pub(crate) type Allocator = AllocatorInner;

pub(crate) const fn new_allocator() -> Allocator {
    AllocatorInner {}
}
