//! Host-native harness for `heapguard`'s integration tests.
//!
//! Plays the same role the teacher's `libjs_tests::JsEngine` plays for
//! `libjs`: a thin wrapper that lets the core run under plain `cargo test`
//! with no kernel or real `sbrk` underneath it, by handing `Heap` a
//! page-aligned arena carved out of the host allocator instead.

use std::alloc::{alloc_zeroed, Layout};

use heapguard::layout::PAGE_SIZE;
use heapguard::test_support::ArenaPageSource;
use heapguard::Heap;

/// Page count generous enough for every scenario in this crate's test
/// suites without nearing `ArenaPageSource`'s capacity ceiling.
pub const DEFAULT_PAGES: usize = 64;

/// Build a fresh, already-`setup` heap backed by a leaked, page-aligned
/// host allocation. The leak is intentional and bounded by the test
/// process's lifetime — there is no `PageSource` capable of returning
/// host memory to the system allocator once reserved this way.
pub fn fresh_heap(pages: usize) -> Heap<ArenaPageSource> {
    let layout = Layout::from_size_align(pages * PAGE_SIZE, PAGE_SIZE)
        .expect("page count * PAGE_SIZE is always a valid, page-aligned layout");
    // SAFETY: `layout` has non-zero size; the returned pointer is checked
    // for null before use.
    let ptr = unsafe { alloc_zeroed(layout) };
    assert!(!ptr.is_null(), "arena allocation failed");
    // SAFETY: `ptr` was just allocated with exactly this length and is
    // leaked for the remainder of the process, satisfying `'static`.
    let arena: &'static mut [u8] = unsafe { std::slice::from_raw_parts_mut(ptr, pages * PAGE_SIZE) };

    let mut heap = Heap::new(ArenaPageSource::new(arena));
    assert_eq!(heap.setup(), 0, "setup on a freshly-reserved arena must succeed");
    heap
}

/// [`fresh_heap`] with [`DEFAULT_PAGES`].
pub fn default_heap() -> Heap<ArenaPageSource> {
    fresh_heap(DEFAULT_PAGES)
}
