//! The owning allocator instance: the typed byte buffer and the four
//! pieces of running state that used to live in a file-scope `HEAP`
//! struct embedded at offset 0 of the managed bytes.
//!
//! Rust's ownership model lets that control block move out of the raw
//! region and into the `Heap<P>` struct itself — the region no longer
//! needs to reserve its own front page for self-description, so the
//! first header sits at the region base rather than after a
//! `sizeof(Heap control block)` offset. This is recorded as a resolved
//! open question in `DESIGN.md`; every other invariant (contiguity,
//! address ordering, fence/checksum bookkeeping) is unchanged.

use core::ptr::NonNull;

use crate::header::Header;
use crate::layout::PAGE_SIZE;
use crate::page_source::PageSource;

/// An allocator instance: one contiguous region plus its block list,
/// generic over how pages are actually grown (`P: PageSource`).
///
/// Exactly one `Heap<P>` should be live per `PageSource` — the single-
/// mutator, single-region model `spec.md` §5 requires. Nothing here is
/// `Sync`; the host is responsible for serializing calls externally if
/// shared across threads.
pub struct Heap<P: PageSource> {
    pub(crate) page_source: P,
    pub(crate) base: Option<NonNull<u8>>,
    pub(crate) pages: usize,
    pub(crate) head: Option<NonNull<Header>>,
    pub(crate) headers_allocated: usize,
    pub(crate) c_sum: u64,
}

// SAFETY: a `Heap<P>` owns its region outright; nothing aliases into the
// raw pointer fields except through the pointers it hands out to callers,
// who are bound by the same single-mutator contract as every other heap
// API. The `P: Send` bound covers the one field this doesn't argue for on
// its own — `page_source` — since a `PageSource` closing over thread-
// affine state (e.g. `Rc`, a thread-local handle) must not become
// sendable just by being wrapped in a `Heap`.
unsafe impl<P: PageSource + Send> Send for Heap<P> {}

impl<P: PageSource> Heap<P> {
    pub const fn new(page_source: P) -> Self {
        Self {
            page_source,
            base: None,
            pages: 0,
            head: None,
            headers_allocated: 0,
            c_sum: 0,
        }
    }

    /// Obtain one page and reset all bookkeeping. Returns `0` on success,
    /// `-1` if the underlying page request fails.
    pub fn setup(&mut self) -> i32 {
        match self.page_source.adjust(1) {
            Some(addr) => {
                self.base = NonNull::new(addr as *mut u8);
                self.pages = 1;
                self.head = None;
                self.headers_allocated = 0;
                self.c_sum = 0;
                0
            }
            None => -1,
        }
    }

    /// Grow the region by `pages_to_allocate` pages. Leaves state
    /// unchanged on failure.
    pub(crate) fn request_more_space(&mut self, pages_to_allocate: usize) -> bool {
        if pages_to_allocate == 0 {
            return true;
        }
        match self.page_source.adjust(pages_to_allocate as isize) {
            Some(_) => {
                self.pages += pages_to_allocate;
                #[cfg(feature = "logging")]
                log::trace!("grew region by {pages_to_allocate} pages, now {} pages", self.pages);
                true
            }
            None => {
                #[cfg(feature = "logging")]
                log::warn!("page request for {pages_to_allocate} pages failed");
                false
            }
        }
    }

    /// Zero the region, drop every reference, and return all pages.
    /// No-op if the region is absent; proceeds even if the block list is
    /// corrupted (`clean` is the recovery primitive of last resort).
    pub fn clean(&mut self) {
        let Some(base) = self.base else { return };

        let mem_size = self.pages * PAGE_SIZE;
        // SAFETY: `[base, base + mem_size)` is memory this heap owns
        // exclusively, established by a prior successful `setup`/growth.
        unsafe { base.as_ptr().write_bytes(0, mem_size) };

        self.head = None;
        self.headers_allocated = 0;
        self.c_sum = 0;
        self.base = None;
        let pages = core::mem::replace(&mut self.pages, 0);
        self.page_source.adjust(-(pages as isize));
    }

    /// Address one byte past the end of the committed region.
    pub(crate) fn region_end(&self) -> Option<NonNull<u8>> {
        let base = self.base?;
        // SAFETY: stays within the committed span by construction.
        Some(unsafe { NonNull::new_unchecked(base.as_ptr().add(self.pages * PAGE_SIZE)) })
    }

    /// Walk to the last header in address order. Explicit loop — the
    /// original's tail recursion would grow the stack unboundedly on a
    /// large heap.
    pub(crate) fn last(&self) -> Option<NonNull<Header>> {
        let mut current = self.head?;
        loop {
            // SAFETY: every header reachable from `head` is valid.
            let next = unsafe { current.as_ref().next };
            match next {
                Some(n) => current = n,
                None => return Some(current),
            }
        }
    }
}
