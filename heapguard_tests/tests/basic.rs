//! End-to-end malloc/free/realloc scenarios.
//!
//! Each test corresponds to one numbered scenario from the allocator's
//! public-call dispatch tables. No fence/checksum tampering here — see
//! `corruption.rs` for that.

use heapguard::{HeapValidation, PointerType};
use heapguard_tests::default_heap;

#[test]
fn free_after_single_allocation_leaves_an_empty_heap() {
    let mut heap = default_heap();

    let p = heap.malloc(100).expect("100 bytes should fit a freshly-set-up heap");
    assert_eq!(heap.validate(), HeapValidation::Ok);

    heap.free(Some(p));
    assert_eq!(heap.validate(), HeapValidation::Ok);
    assert_eq!(heap.largest_used_block_size(), 0);
}

#[test]
fn freeing_then_reallocating_reuses_the_block() {
    let mut heap = default_heap();

    let p = heap.malloc(100).unwrap();
    let _q = heap.malloc(200).unwrap();
    heap.free(Some(p));

    // Small enough that first-fit's split branch fires: `100 > footprint(10) + 1`.
    let r = heap.malloc(10).unwrap();
    assert_eq!(heap.validate(), HeapValidation::Ok);
    assert_eq!(r, p, "the split-off used portion keeps p's address");
    assert_eq!(heap.get_pointer_type(r.as_ptr()), PointerType::Valid);
}

#[test]
fn freeing_then_reallocating_just_under_the_footprint_skips_the_split() {
    let mut heap = default_heap();

    let p = heap.malloc(100).unwrap();
    let _q = heap.malloc(200).unwrap();
    heap.free(Some(p));

    // Tight fit: picking a size close to 100 guarantees
    // `100 <= header_overhead() + size + 1` without splitting.
    let r = heap.malloc(90).unwrap();
    assert_eq!(heap.validate(), HeapValidation::Ok);
    assert_eq!(r, p, "tight fit reuses the same block without splitting");
}

#[test]
fn realloc_to_a_smaller_size_keeps_the_same_pointer() {
    let mut heap = default_heap();

    let p = heap.malloc(100).unwrap();
    let q = heap.realloc(Some(p), 50).unwrap();

    assert_eq!(q, p);
    assert_eq!(heap.validate(), HeapValidation::Ok);
    assert_eq!(heap.largest_used_block_size(), 50);
}

#[test]
fn realloc_growing_into_a_freed_successor_stays_in_place() {
    let mut heap = default_heap();

    let p = heap.malloc(100).unwrap();
    let q = heap.malloc(200).unwrap();
    heap.free(Some(q));

    let r = heap.realloc(Some(p), 250).unwrap();
    assert_eq!(r, p, "growing into a freed successor must not relocate");
    assert_eq!(heap.validate(), HeapValidation::Ok);
    assert_eq!(heap.largest_used_block_size(), 250);
}

#[test]
fn realloc_absorbing_the_entire_successor_unlinks_it() {
    let mut heap = default_heap();

    let p = heap.malloc(100).unwrap();
    let q = heap.malloc(32).unwrap();
    heap.free(Some(q));

    // Exactly `p.memory_size + q.memory_size`: not enough to satisfy the
    // partial-consumption branch (`memory_size + next_size > count`), but
    // the successor's header/fences still fit inside the reach, so the
    // whole successor is absorbed and unlinked rather than split again.
    let count = 100 + 32;
    let r = heap.realloc(Some(p), count).unwrap();
    assert_eq!(r, p);
    assert_eq!(heap.validate(), HeapValidation::Ok);
    assert_eq!(heap.largest_used_block_size(), count);
}

#[test]
fn realloc_with_a_used_successor_relocates() {
    let mut heap = default_heap();

    let p = heap.malloc(64).unwrap();
    let _q = heap.malloc(64).unwrap(); // stays used, blocks in-place growth
    unsafe { p.as_ptr().write_bytes(0xAB, 64) };
    let expected = vec![0xABu8; 64];

    let r = heap.realloc(Some(p), 128).unwrap();
    assert_ne!(r, p, "a used successor forces relocation");
    assert_eq!(heap.validate(), HeapValidation::Ok);
    let moved = unsafe { std::slice::from_raw_parts(r.as_ptr(), 64) };
    assert_eq!(moved, &expected[..], "relocation preserves the leading min(old, new) bytes");
}

#[test]
fn realloc_with_count_zero_frees_and_returns_absent() {
    let mut heap = default_heap();
    let p = heap.malloc(40).unwrap();

    let r = heap.realloc(Some(p), 0);
    assert!(r.is_none());
    assert_eq!(heap.validate(), HeapValidation::Ok);
    assert_eq!(heap.largest_used_block_size(), 0);
}

#[test]
fn realloc_with_an_absent_pointer_behaves_as_malloc() {
    let mut heap = default_heap();
    let r = heap.realloc(None, 40).unwrap();
    assert_eq!(heap.get_pointer_type(r.as_ptr()), PointerType::Valid);
}

#[test]
fn calloc_zero_fills_the_payload() {
    let mut heap = default_heap();
    let p = heap.calloc(16, 8).unwrap();
    let bytes = unsafe { std::slice::from_raw_parts(p.as_ptr(), 16 * 8) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn malloc_of_zero_bytes_is_rejected() {
    let mut heap = default_heap();
    assert!(heap.malloc(0).is_none());
}

#[test]
fn free_of_null_is_a_no_op() {
    let mut heap = default_heap();
    heap.free(None);
    assert_eq!(heap.validate(), HeapValidation::Ok);
}

#[test]
fn double_free_is_ignored_the_second_time() {
    let mut heap = default_heap();
    let p = heap.malloc(48).unwrap();
    heap.free(Some(p));
    // `p` no longer classifies as a valid payload start, so the second
    // free is a silent no-op rather than a double-free.
    heap.free(Some(p));
    assert_eq!(heap.validate(), HeapValidation::Ok);
}

#[test]
fn allocation_grows_the_region_past_one_page() {
    let mut heap = default_heap();
    // Larger than a single page's usable span, forcing `request_pages`.
    let p = heap.malloc(heapguard::layout::PAGE_SIZE * 3).unwrap();
    assert_eq!(heap.validate(), HeapValidation::Ok);
    assert_eq!(heap.get_pointer_type(p.as_ptr()), PointerType::Valid);
}

#[test]
fn heap_clean_zeroes_bookkeeping_and_region_becomes_absent() {
    let mut heap = default_heap();
    let _p = heap.malloc(32).unwrap();
    heap.clean();
    assert_eq!(heap.validate(), HeapValidation::RegionAbsent);
    assert_eq!(heap.largest_used_block_size(), 0);
}
