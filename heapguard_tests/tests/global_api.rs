//! The legacy C-style single-global API (`spec.md` §6's call table), run
//! serially against one process-wide default instance.
//!
//! `cargo test` runs these in one process but potentially different
//! threads; `heapguard::global` documents that callers must serialize
//! access themselves, so every test here takes a process-wide lock first.

use std::sync::Mutex;

use heapguard::PointerType;

static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn setup_malloc_free_clean_round_trip() {
    let _guard = GLOBAL_LOCK.lock().unwrap();
    // SAFETY: serialized by `GLOBAL_LOCK` for the duration of this test.
    unsafe {
        assert_eq!(heapguard::global::heap_setup(), 0);

        let p = heapguard::global::heap_malloc(128).expect("malloc should succeed");
        assert_eq!(heapguard::global::heap_validate(), 0);
        assert_eq!(heapguard::global::get_pointer_type(p.as_ptr()), PointerType::Valid);

        heapguard::global::heap_free(Some(p));
        assert_eq!(heapguard::global::heap_validate(), 0);
        assert_eq!(heapguard::global::heap_get_largest_used_block_size(), 0);

        heapguard::global::heap_clean();
        assert_eq!(heapguard::global::heap_validate(), 2, "region absent after clean");
    }
}

#[test]
fn calloc_then_realloc_through_the_global_instance() {
    let _guard = GLOBAL_LOCK.lock().unwrap();
    // SAFETY: serialized by `GLOBAL_LOCK` for the duration of this test.
    unsafe {
        assert_eq!(heapguard::global::heap_setup(), 0);

        let p = heapguard::global::heap_calloc(4, 16).expect("calloc should succeed");
        let bytes = std::slice::from_raw_parts(p.as_ptr(), 64);
        assert!(bytes.iter().all(|&b| b == 0));

        let q = heapguard::global::heap_realloc(Some(p), 32).expect("shrink should succeed");
        assert_eq!(q, p);
        assert_eq!(heapguard::global::heap_get_largest_used_block_size(), 32);

        heapguard::global::heap_clean();
    }
}

#[test]
fn get_pointer_type_of_null_is_null_without_a_region() {
    let _guard = GLOBAL_LOCK.lock().unwrap();
    // SAFETY: serialized by `GLOBAL_LOCK`; no setup call needed since
    // `get_pointer_type` short-circuits on a null pointer before touching
    // the default instance at all.
    unsafe {
        assert_eq!(heapguard::global::get_pointer_type(std::ptr::null()), PointerType::Null);
    }
}
