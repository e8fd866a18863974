//! The classic C-style single-global API, offered as a thin wrapper over
//! one process-wide default instance.
//!
//! `spec.md`'s data model treats the Region as a process-wide singleton;
//! the core itself rejects that in favour of an explicit `Heap<P>`
//! instance (see `region.rs`). This module is the opt-in compatibility
//! shim for callers that want the legacy global-state shape anyway — it
//! carries exactly the same single-mutator, no-locking contract the
//! original file-scope `static HEAP *heap` did, just made explicit: every
//! function here is `unsafe` to call from more than one thread at a time.

use core::ptr::NonNull;

use crate::platform::MmapPageSource;
use crate::region::Heap;
use crate::validator::PointerType;

/// Pages reserved up front for the default global instance's virtual
/// span. Generous since reservation alone costs no physical memory.
const DEFAULT_RESERVED_PAGES: usize = 1 << 16; // 256 MiB worth of PAGE_SIZE pages

static mut DEFAULT_HEAP: Option<Heap<MmapPageSource>> = None;

/// # Safety
///
/// Must not be called concurrently with any other function in this
/// module — the allocator is single-mutator by design (`spec.md` §5);
/// the caller is responsible for serializing all access to the default
/// instance.
unsafe fn with_default<R>(f: impl FnOnce(&mut Heap<MmapPageSource>) -> R) -> Option<R> {
    // SAFETY: caller contract above.
    let heap = unsafe { core::ptr::addr_of_mut!(DEFAULT_HEAP).as_mut().unwrap() };
    heap.as_mut().map(f)
}

/// Initialize the default global instance. `0` on success, `-1` if the
/// underlying page reservation or first page request fails.
///
/// # Safety
///
/// See the module-level safety note.
pub unsafe fn heap_setup() -> i32 {
    let Some(page_source) = MmapPageSource::new(DEFAULT_RESERVED_PAGES) else {
        return -1;
    };
    let mut heap = Heap::new(page_source);
    let rc = heap.setup();
    if rc == 0 {
        // SAFETY: caller contract above.
        unsafe { *core::ptr::addr_of_mut!(DEFAULT_HEAP) = Some(heap) };
    }
    rc
}

/// Tear down the default global instance. No-op if it was never set up.
///
/// # Safety
///
/// See the module-level safety note.
pub unsafe fn heap_clean() {
    // SAFETY: caller contract above.
    unsafe {
        if let Some(heap) = core::ptr::addr_of_mut!(DEFAULT_HEAP).as_mut().unwrap() {
            heap.clean();
        }
    }
}

/// # Safety
///
/// See the module-level safety note.
pub unsafe fn heap_malloc(size: usize) -> Option<NonNull<u8>> {
    // SAFETY: caller contract above.
    unsafe { with_default(|heap| heap.malloc(size)) }.flatten()
}

/// # Safety
///
/// See the module-level safety note.
pub unsafe fn heap_calloc(number: usize, size: usize) -> Option<NonNull<u8>> {
    // SAFETY: caller contract above.
    unsafe { with_default(|heap| heap.calloc(number, size)) }.flatten()
}

/// # Safety
///
/// See the module-level safety note.
pub unsafe fn heap_realloc(memblock: Option<NonNull<u8>>, count: usize) -> Option<NonNull<u8>> {
    // SAFETY: caller contract above.
    unsafe { with_default(|heap| heap.realloc(memblock, count)) }.flatten()
}

/// # Safety
///
/// See the module-level safety note.
pub unsafe fn heap_free(memblock: Option<NonNull<u8>>) {
    // SAFETY: caller contract above.
    unsafe { with_default(|heap| heap.free(memblock)) };
}

/// # Safety
///
/// See the module-level safety note.
pub unsafe fn heap_get_largest_used_block_size() -> usize {
    // SAFETY: caller contract above.
    unsafe { with_default(|heap| heap.largest_used_block_size()) }.unwrap_or(0)
}

/// # Safety
///
/// See the module-level safety note.
pub unsafe fn heap_validate() -> i32 {
    // SAFETY: caller contract above.
    unsafe { with_default(|heap| heap.validate().code()) }.unwrap_or(2)
}

/// # Safety
///
/// See the module-level safety note.
pub unsafe fn get_pointer_type(pointer: *const u8) -> PointerType {
    if pointer.is_null() {
        return PointerType::Null;
    }
    // SAFETY: caller contract above.
    unsafe { with_default(|heap| heap.get_pointer_type(pointer)) }.unwrap_or(PointerType::Unallocated)
}
