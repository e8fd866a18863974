//! Read-only inspectors: `heap_validate` and `get_pointer_type`.
//!
//! Both walk the same structures the mutating paths maintain; neither
//! ever writes anything.

use core::fmt;

use crate::header::HEADER_STRUCT_SIZE;
use crate::layout::FENCE_LENGTH;
use crate::page_source::PageSource;
use crate::region::Heap;

/// Layered diagnosis returned by [`Heap::validate`]. Order matters: each
/// check presupposes the previous ones passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapValidation {
    /// Every invariant checked held.
    Ok,
    /// `c_sum` disagrees with the live fence-byte population — a fence
    /// was overwritten (or bookkeeping drifted).
    FenceMismatch,
    /// No region has been set up (or it has been torn down).
    RegionAbsent,
    /// At least one header's checksum no longer matches its fields.
    ChecksumMismatch,
}

impl HeapValidation {
    /// The legacy C-style status code: `0`/`1`/`2`/`3`.
    pub const fn code(self) -> i32 {
        match self {
            HeapValidation::Ok => 0,
            HeapValidation::FenceMismatch => 1,
            HeapValidation::RegionAbsent => 2,
            HeapValidation::ChecksumMismatch => 3,
        }
    }
}

impl fmt::Display for HeapValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapValidation::Ok => f.write_str("heap is valid"),
            HeapValidation::FenceMismatch => f.write_str("fence byte population disagrees with heap.c_sum"),
            HeapValidation::RegionAbsent => f.write_str("no region is set up"),
            HeapValidation::ChecksumMismatch => f.write_str("a header checksum no longer matches its fields"),
        }
    }
}

/// Classification of an arbitrary address relative to a heap's blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerType {
    Null,
    HeapCorrupted,
    ControlBlock,
    InsideFences,
    InsideDataBlock,
    Unallocated,
    Valid,
}

impl fmt::Display for PointerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerType::Null => f.write_str("null pointer"),
            PointerType::HeapCorrupted => f.write_str("heap is corrupted"),
            PointerType::ControlBlock => f.write_str("points inside a header"),
            PointerType::InsideFences => f.write_str("points inside a fence"),
            PointerType::InsideDataBlock => f.write_str("points inside a live payload"),
            PointerType::Unallocated => f.write_str("not a live allocation"),
            PointerType::Valid => f.write_str("a valid allocation start"),
        }
    }
}

/// A read-only snapshot of one block's layout-relevant fields, for test
/// harnesses that need to check invariants (address adjacency, free-block
/// non-adjacency) that the four public calls have no reason to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSnapshot {
    pub address: usize,
    pub memory_size: usize,
    pub is_free: bool,
}

/// Forward walk over a heap's blocks in address order, yielding
/// [`BlockSnapshot`]s. Never mutates anything it touches.
pub struct BlockIter<'h> {
    current: Option<core::ptr::NonNull<crate::header::Header>>,
    _marker: core::marker::PhantomData<&'h ()>,
}

impl Iterator for BlockIter<'_> {
    type Item = BlockSnapshot;

    fn next(&mut self) -> Option<BlockSnapshot> {
        let header = self.current?;
        // SAFETY: every header reachable from a heap's `head` is valid for
        // the lifetime of the borrow that produced this iterator.
        let header_ref = unsafe { header.as_ref() };
        self.current = header_ref.next;
        Some(BlockSnapshot {
            address: header.as_ptr() as usize,
            memory_size: header_ref.memory_size,
            is_free: header_ref.is_free,
        })
    }
}

impl<P: PageSource> Heap<P> {
    /// Iterate this heap's blocks in address order. Read-only; intended
    /// for test harnesses checking structural invariants, not for use by
    /// the allocator's own mutating paths.
    pub fn blocks(&self) -> BlockIter<'_> {
        BlockIter { current: self.head, _marker: core::marker::PhantomData }
    }

    /// Every header's checksum still matches its current field values.
    fn header_checksums_valid(&self) -> bool {
        let mut current = self.head;
        while let Some(header) = current {
            // SAFETY: every header reachable from `head` is valid.
            let header_ref = unsafe { header.as_ref() };
            if !header_ref.checksum_valid() {
                return false;
            }
            current = header_ref.next;
        }
        true
    }

    /// Layered corruption check: region presence, then per-header
    /// checksums, then the global fence-byte census.
    pub fn validate(&self) -> HeapValidation {
        if self.base.is_none() {
            return HeapValidation::RegionAbsent;
        }
        if !self.header_checksums_valid() {
            return HeapValidation::ChecksumMismatch;
        }
        // SAFETY: checksums just verified valid implies every linked
        // header is well-formed.
        if self.c_sum != unsafe { crate::fence::count_fences(self.head) } {
            #[cfg(feature = "logging")]
            log::warn!("heap_validate: fence byte population disagrees with heap.c_sum");
            return HeapValidation::FenceMismatch;
        }
        HeapValidation::Ok
    }

    /// Classify an arbitrary address relative to this heap's blocks.
    /// Accepts a possibly-null, possibly-foreign pointer by design — this
    /// is the oracle callers use to tell a valid payload start from a
    /// wild pointer before trusting it.
    pub fn get_pointer_type(&self, pointer: *const u8) -> PointerType {
        if pointer.is_null() {
            return PointerType::Null;
        }
        // Only the fence/checksum-sum disagreement short-circuits here;
        // a raw checksum mismatch is diagnosed structurally below by the
        // header walk instead (mirrors the original's layering).
        if self.validate() == HeapValidation::FenceMismatch {
            return PointerType::HeapCorrupted;
        }

        let Some(base) = self.base else {
            return PointerType::Unallocated;
        };
        let addr = pointer as usize;
        let base_addr = base.as_ptr() as usize;

        if addr < base_addr {
            return PointerType::Unallocated;
        }
        // The owning heap's own bookkeeping no longer lives inside the
        // managed region (see `region.rs`), so this reserved span is
        // empty; kept for structural parity with the zone table.
        const CONTROL_BLOCK_RESERVED: usize = 0;
        if addr < base_addr + CONTROL_BLOCK_RESERVED {
            return PointerType::ControlBlock;
        }

        let Some(head) = self.head else {
            return PointerType::Unallocated;
        };

        let mut current = head;
        loop {
            // SAFETY: every header reachable from `head` is valid.
            let next = unsafe { current.as_ref().next };
            match next {
                Some(n) if (n.as_ptr() as usize) <= addr => current = n,
                _ => break,
            }
        }

        // SAFETY: `current` was reached by walking from a valid `head`.
        let header = unsafe { current.as_ref() };
        let header_start = current.as_ptr() as usize;
        let header_bytes_end = header_start + HEADER_STRUCT_SIZE;
        let user_memory_addr = header.user_memory.as_ptr() as usize;
        let right_fence_start = user_memory_addr + header.memory_size;
        let block_end = right_fence_start + FENCE_LENGTH;
        let is_free = header.is_free;

        if addr < header_bytes_end {
            PointerType::ControlBlock
        } else if addr < user_memory_addr {
            if !is_free { PointerType::InsideFences } else { PointerType::Unallocated }
        } else if addr == user_memory_addr {
            if !is_free { PointerType::Valid } else { PointerType::Unallocated }
        } else if addr < right_fence_start {
            if !is_free { PointerType::InsideDataBlock } else { PointerType::Unallocated }
        } else if addr < block_end {
            if !is_free { PointerType::InsideFences } else { PointerType::Unallocated }
        } else {
            PointerType::Unallocated
        }
    }

    /// Largest `memory_size` among currently-used blocks, or `0` if the
    /// region is absent, empty, or fails validation.
    pub fn largest_used_block_size(&self) -> usize {
        if self.base.is_none() || self.head.is_none() || self.validate() != HeapValidation::Ok {
            return 0;
        }
        let mut max_size = 0usize;
        let mut current = self.head;
        while let Some(header) = current {
            // SAFETY: every header reachable from `head` is valid.
            let header_ref = unsafe { header.as_ref() };
            if !header_ref.is_free {
                max_size = max_size.max(header_ref.memory_size);
            }
            current = header_ref.next;
        }
        max_size
    }
}
