//! A host-native stand-in for a real page-growth primitive, so the core
//! can be driven to full coverage without a kernel or a `libc` underneath
//! it. Always compiled — not gated behind `std` — since it is itself
//! `no_std` and useful for doctests as well as `heapguard_tests`.

use crate::layout::PAGE_SIZE;
use crate::page_source::PageSource;

/// A fixed-capacity `PageSource` backed by a caller-supplied slab of
/// memory, with no real `sbrk`/`mmap` underneath. Plays the same role
/// `heapguard_tests`'s harness plays for the rest of this crate that a
/// process model would otherwise supply.
pub struct ArenaPageSource {
    base: usize,
    capacity_pages: usize,
    committed_pages: usize,
}

impl ArenaPageSource {
    /// `arena` must be page-aligned and at least one page long; its
    /// length (rounded down to whole pages) becomes the capacity ceiling.
    pub fn new(arena: &'static mut [u8]) -> Self {
        let base = arena.as_mut_ptr() as usize;
        debug_assert_eq!(base % PAGE_SIZE, 0, "arena must be page-aligned");
        Self {
            base,
            capacity_pages: arena.len() / PAGE_SIZE,
            committed_pages: 0,
        }
    }
}

// SAFETY: the arena is a single fixed, caller-owned span; `committed_pages`
// only ever grows toward `capacity_pages` and shrinks back down, so the
// returned base is always the same address plus a monotonically-tracked
// offset within that one span.
unsafe impl PageSource for ArenaPageSource {
    fn adjust(&mut self, delta_pages: isize) -> Option<usize> {
        let old_break = self.base + self.committed_pages * PAGE_SIZE;
        if delta_pages >= 0 {
            let new_committed = self.committed_pages.checked_add(delta_pages as usize)?;
            if new_committed > self.capacity_pages {
                return None;
            }
            self.committed_pages = new_committed;
        } else {
            let shrink = (-delta_pages) as usize;
            self.committed_pages = self.committed_pages.checked_sub(shrink)?;
        }
        Some(old_break)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_and_shrinks_within_capacity() {
        static mut ARENA: [u8; PAGE_SIZE * 4] = [0; PAGE_SIZE * 4];
        // SAFETY: test-local, single-threaded access to a static buffer.
        let arena: &'static mut [u8] = unsafe { &mut *core::ptr::addr_of_mut!(ARENA) };
        let mut source = ArenaPageSource::new(arena);

        let first = source.adjust(1).expect("first page should commit");
        let second = source.adjust(2).expect("growth within capacity should succeed");
        assert_eq!(second, first + PAGE_SIZE);
        assert!(source.adjust(10).is_none(), "growth past capacity must fail");
        assert!(source.adjust(-3).is_some());
        assert!(source.adjust(-1).is_some());
        assert!(source.adjust(-1).is_none(), "cannot shrink below zero committed pages");
    }
}
