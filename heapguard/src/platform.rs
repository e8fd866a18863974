//! A real `PageSource` backed by `libc::mmap`, for hosts that have an
//! OS underneath them. Mirrors the reserve-then-commit idiom anyOS's own
//! `stdlib::process::sbrk`/`mmap` pair models at the syscall layer: one
//! large virtual span is reserved once so the base address never moves,
//! and `adjust` only changes how much of it is actually backed by
//! readable/writable pages.

use crate::layout::PAGE_SIZE;
use crate::page_source::PageSource;

/// Upper bound on how many pages a single [`MmapPageSource`] will ever
/// commit. Chosen generously since the reservation itself costs no
/// physical memory — only address space.
const MAX_RESERVED_PAGES: usize = 1 << 20; // 4 GiB worth of PAGE_SIZE pages

/// A `PageSource` that reserves one large anonymous mapping up front and
/// grows/shrinks the committed prefix of it via `mprotect`.
pub struct MmapPageSource {
    base: *mut libc::c_void,
    reserved_pages: usize,
    committed_pages: usize,
}

impl MmapPageSource {
    /// Reserve `reserved_pages` worth of address space (not yet backed by
    /// physical memory). Returns `None` if the reservation itself fails.
    pub fn new(reserved_pages: usize) -> Option<Self> {
        let reserved_pages = reserved_pages.min(MAX_RESERVED_PAGES).max(1);
        let len = reserved_pages * PAGE_SIZE;
        // SAFETY: a fresh anonymous, non-file-backed mapping; no aliasing
        // with any existing allocation.
        let base = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                len,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return None;
        }
        Some(Self { base, reserved_pages, committed_pages: 0 })
    }
}

impl Drop for MmapPageSource {
    fn drop(&mut self) {
        // SAFETY: `base`/`reserved_pages * PAGE_SIZE` is exactly the
        // mapping this struct reserved in `new` and owns exclusively.
        unsafe { libc::munmap(self.base, self.reserved_pages * PAGE_SIZE) };
    }
}

// SAFETY: `base` is fixed for the lifetime of the mapping; `adjust` only
// ever changes the committed prefix via `mprotect`, never the base
// address, and leaves state untouched on failure.
unsafe impl PageSource for MmapPageSource {
    fn adjust(&mut self, delta_pages: isize) -> Option<usize> {
        let old_break = (self.base as usize) + self.committed_pages * PAGE_SIZE;

        if delta_pages >= 0 {
            let grow = delta_pages as usize;
            let new_committed = self.committed_pages.checked_add(grow)?;
            if new_committed > self.reserved_pages {
                return None;
            }
            // SAFETY: `[old_break, old_break + grow*PAGE_SIZE)` lies
            // entirely within the reservation and was previously
            // `PROT_NONE`.
            let rc = unsafe {
                libc::mprotect(
                    old_break as *mut libc::c_void,
                    grow * PAGE_SIZE,
                    libc::PROT_READ | libc::PROT_WRITE,
                )
            };
            if rc != 0 {
                return None;
            }
            self.committed_pages = new_committed;
        } else {
            let shrink = (-delta_pages) as usize;
            let new_committed = self.committed_pages.checked_sub(shrink)?;
            let shrink_start = (self.base as usize) + new_committed * PAGE_SIZE;
            // SAFETY: the span being decommitted was committed by a prior
            // successful grow and is about to be dropped from the logical
            // region.
            unsafe {
                libc::mprotect(
                    shrink_start as *mut libc::c_void,
                    shrink * PAGE_SIZE,
                    libc::PROT_NONE,
                )
            };
            self.committed_pages = new_committed;
        }

        Some(old_break)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commits_and_decommits_without_moving_base() {
        let mut source = MmapPageSource::new(16).expect("reservation should succeed");
        let first = source.adjust(1).unwrap();
        let second = source.adjust(2).unwrap();
        assert_eq!(second, first + PAGE_SIZE);
        assert!(source.adjust(-3).is_some());
    }

    #[test]
    fn refuses_to_grow_past_reservation() {
        let mut source = MmapPageSource::new(2).expect("reservation should succeed");
        assert!(source.adjust(1).is_some());
        assert!(source.adjust(1).is_some());
        assert!(source.adjust(1).is_none());
    }
}
