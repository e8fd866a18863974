//! First-fit allocation, end-of-heap extension, in-place resize, and the
//! relocate-and-copy `realloc` fallback.

use core::ptr::NonNull;

use crate::block_list::{self, checked_block_footprint};
use crate::fence;
use crate::header::{Header, HEADER_STRUCT_SIZE};
use crate::layout::{FENCE_LENGTH, PAGE_SIZE};
use crate::page_source::PageSource;
use crate::region::Heap;
use crate::validator::{HeapValidation, PointerType};

#[inline]
fn header_from_payload(ptr: NonNull<u8>) -> NonNull<Header> {
    // SAFETY: every payload pointer this crate hands out is preceded by
    // `HEADER_STRUCT_SIZE + FENCE_LENGTH` bytes belonging to its header
    // and left fence.
    unsafe { NonNull::new_unchecked(ptr.as_ptr().sub(FENCE_LENGTH + HEADER_STRUCT_SIZE).cast::<Header>()) }
}

impl<P: PageSource> Heap<P> {
    /// First-fit allocation. Returns an absent pointer on a zero-size
    /// request, a corrupted region, a size whose footprint would
    /// overflow, or resource exhaustion.
    pub fn malloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        if self.validate() != HeapValidation::Ok {
            return None;
        }
        let footprint = checked_block_footprint(size)?;

        if self.head.is_none() {
            return self.handle_empty_heap(size);
        }

        let mut current = self.head;
        while let Some(mut header) = current {
            // SAFETY: every header reachable from `head` is valid.
            let (is_free, mem_size) = unsafe { (header.as_ref().is_free, header.as_ref().memory_size) };
            if is_free && mem_size == size {
                // SAFETY: `header` is a valid, exclusively-owned header.
                unsafe {
                    header.as_mut().is_free = false;
                    header.as_mut().restamp();
                    return Some(header.as_ref().user_memory);
                }
            } else if is_free && mem_size > footprint + 1 {
                // SAFETY: precondition checked above.
                unsafe {
                    block_list::split(header, size);
                    // `split` carves a brand-new header out of `header`'s
                    // tail; `block_list` never touches the heap-level
                    // totals itself (block_list.rs:1-7), so the new
                    // header's bookkeeping cost is ours to account for.
                    self.headers_allocated += 1;
                    self.c_sum += 2 * FENCE_LENGTH as u64;
                    return Some(header.as_ref().user_memory);
                }
            } else if is_free && mem_size > size {
                // Tight fit: shrink in place, orphaning the slack bytes
                // until the next `free`'s post-coalesce resize reclaims
                // them (invariant restored lazily, by design).
                // SAFETY: `header` is a valid, exclusively-owned header.
                unsafe {
                    header.as_mut().memory_size = size;
                    header.as_mut().is_free = false;
                    fence::fill_fences(header);
                    return Some(header.as_ref().user_memory);
                }
            }
            // SAFETY: `header` is valid.
            current = unsafe { header.as_ref().next };
        }

        self.handle_no_free_blocks(size)
    }

    fn handle_empty_heap(&mut self, size: usize) -> Option<NonNull<u8>> {
        let footprint = checked_block_footprint(size)?;
        let capacity = self.pages * PAGE_SIZE;

        if capacity < footprint {
            let deficit = footprint - capacity;
            let pages_to_allocate = deficit / PAGE_SIZE + 1;
            if !self.request_more_space(pages_to_allocate) {
                return None;
            }
            return self.malloc(size);
        }

        // `validate() == Ok` above guarantees `base` is present.
        let base = self.base.expect("validated heap has a base");
        let header = base.cast::<Header>();
        // SAFETY: the whole first page is ours and large enough per the
        // capacity check above; `header` has no existing neighbours.
        unsafe { block_list::set_header(header, size, None, None) };
        self.head = Some(header);
        self.headers_allocated += 1;
        self.c_sum += 2 * FENCE_LENGTH as u64;
        // SAFETY: `header` was just fully initialized.
        Some(unsafe { header.as_ref().user_memory })
    }

    fn handle_no_free_blocks(&mut self, size: usize) -> Option<NonNull<u8>> {
        let last_header = self.last().expect("head is Some implies a tail exists");
        // SAFETY: `last_header` is a valid, fully-linked tail header.
        let (last_user_memory, last_size) =
            unsafe { (last_header.as_ref().user_memory, last_header.as_ref().memory_size) };
        // SAFETY: stays within the region — the tail's right fence end.
        let block_end = unsafe {
            NonNull::new_unchecked(last_user_memory.as_ptr().add(last_size + FENCE_LENGTH))
        };
        let region_end = self.region_end().expect("validated heap has a region");

        let footprint = block_list::block_footprint(size) as i64;
        let free_mem_size =
            block_list::offset_between(Some(block_end), Some(region_end)) - PAGE_SIZE as i64;

        if free_mem_size <= footprint {
            let mut pages_to_allocate = ((footprint - free_mem_size) / PAGE_SIZE as i64 + 1) as usize;
            if pages_to_allocate == 0 {
                pages_to_allocate = 1;
            }
            if !self.request_more_space(pages_to_allocate) {
                return None;
            }
            return self.malloc(size);
        }

        let new_header = block_end.cast::<Header>();
        // SAFETY: `block_end` sits inside the region's trailing free span,
        // just verified large enough above.
        unsafe { block_list::set_header(new_header, size, Some(last_header), None) };
        self.headers_allocated += 1;
        self.c_sum += 2 * FENCE_LENGTH as u64;
        // SAFETY: `new_header` was just fully initialized.
        Some(unsafe { new_header.as_ref().user_memory })
    }

    /// Grow the tail block `header` in place to `count` bytes, extending
    /// the region if the trailing free space isn't already enough.
    fn allocate_more_space(&mut self, mut header: NonNull<Header>, count: usize) -> bool {
        // SAFETY: `header` is a valid, exclusively-owned tail header.
        let user_memory = unsafe { header.as_ref().user_memory };
        let memory_size = unsafe { header.as_ref().memory_size };
        // SAFETY: stays within the region.
        let block_end = unsafe { NonNull::new_unchecked(user_memory.as_ptr().add(memory_size)) };
        let region_end = self.region_end().expect("validated heap has a region");
        // SAFETY: derives an address within the region, not a dereference.
        let usable_end = unsafe { NonNull::new_unchecked(region_end.as_ptr().sub(FENCE_LENGTH)) };

        let left_mem = block_list::offset_between(Some(block_end), Some(usable_end));

        if left_mem >= count as i64 {
            // SAFETY: `header` is valid and the new extent fits, per the
            // check above.
            unsafe {
                header.as_mut().memory_size = count;
                fence::fill_fences(header);
            }
            return true;
        }

        let deficit = count as i64 - left_mem;
        let pages_to_allocate = ((deficit + PAGE_SIZE as i64 - 1) / PAGE_SIZE as i64).max(1) as usize;
        if !self.request_more_space(pages_to_allocate) {
            return false;
        }
        // SAFETY: `header` is valid and the region has just grown enough.
        unsafe {
            header.as_mut().memory_size = count;
            fence::fill_fences(header);
        }
        true
    }

    /// Consume part of the free successor, leaving a smaller free
    /// remainder after it.
    fn handle_next_block_free(&mut self, mut handler: NonNull<Header>, count: usize) -> NonNull<u8> {
        // SAFETY: `handler` is valid and has a free successor (checked by the caller).
        let user_memory = unsafe { handler.as_ref().user_memory };
        let next = unsafe { handler.as_ref().next.expect("handle_next_block_free precondition") };
        let next_size = unsafe { next.as_ref().memory_size };
        let next_next = unsafe { next.as_ref().next };
        let handler_size = unsafe { handler.as_ref().memory_size };
        let reduced_size = handler_size + next_size - count;

        // SAFETY: lands inside the span previously owned by `handler` and
        // its successor, which together are large enough per the caller's
        // size check.
        let mut reduced = unsafe {
            NonNull::new_unchecked(user_memory.as_ptr().add(count + FENCE_LENGTH).cast::<Header>())
        };

        // SAFETY: `reduced`'s memory may overlap the old successor's
        // header, but every field we still need from it was captured
        // above before this write.
        unsafe { reduced.as_mut().next = next_next };
        if let Some(mut next_next) = next_next {
            // SAFETY: a block strictly to the right of `reduced`, disjoint from it.
            unsafe {
                next_next.as_mut().prev = Some(reduced);
                next_next.as_mut().restamp();
            }
        }
        // SAFETY: `reduced` is the fresh header we are constructing.
        unsafe {
            reduced.as_mut().is_free = true;
            reduced.as_mut().prev = Some(handler);
            reduced.as_mut().memory_size = reduced_size;
            reduced.as_mut().user_memory = NonNull::new_unchecked(
                reduced.as_ptr().cast::<u8>().add(HEADER_STRUCT_SIZE + FENCE_LENGTH),
            );
            fence::fill_fences(reduced);

            handler.as_mut().next = Some(reduced);
            handler.as_mut().memory_size = count;
            fence::fill_fences(handler);

            handler.as_ref().user_memory
        }
    }

    /// Absorb the free successor entirely, re-linking past it.
    fn handle_next_block_free_and_far(&mut self, mut handler: NonNull<Header>, count: usize) -> NonNull<u8> {
        // SAFETY: `handler` has a free successor (checked by the caller).
        let next = unsafe { handler.as_ref().next.expect("handle_next_block_free_and_far precondition") };
        let next_next = unsafe { next.as_ref().next };

        if let Some(mut next_next) = next_next {
            // SAFETY: still a valid linked header.
            unsafe {
                next_next.as_mut().prev = Some(handler);
                next_next.as_mut().restamp();
            }
        }
        // SAFETY: `handler` is valid and exclusively owned.
        unsafe {
            handler.as_mut().next = next_next;
            handler.as_mut().memory_size = count;
            fence::fill_fences(handler);
        }

        self.c_sum -= 2 * FENCE_LENGTH as u64;
        self.headers_allocated -= 1;

        // SAFETY: `handler` was just re-stamped above.
        unsafe { handler.as_ref().user_memory }
    }

    /// Zero-initializing allocation. The product `number * size` is
    /// computed without an overflow check beyond what `malloc` already
    /// performs, matching the original's unchecked `size_t` multiply.
    pub fn calloc(&mut self, number: usize, size: usize) -> Option<NonNull<u8>> {
        let total = number.wrapping_mul(size);
        let ptr = self.malloc(total)?;
        // SAFETY: `malloc` just returned a payload of exactly `total` bytes.
        unsafe { ptr.as_ptr().write_bytes(0, total) };
        Some(ptr)
    }

    /// Resize a live allocation, growing or shrinking in place where
    /// possible and relocating as a last resort. See the module-level
    /// dispatch table for the exact case ordering.
    pub fn realloc(&mut self, memblock: Option<NonNull<u8>>, count: usize) -> Option<NonNull<u8>> {
        if self.validate() != HeapValidation::Ok {
            return None;
        }
        let Some(memblock) = memblock else {
            return self.malloc(count);
        };
        if count == 0 {
            self.free(Some(memblock));
            return None;
        }
        if self.get_pointer_type(memblock.as_ptr()) != PointerType::Valid {
            return None;
        }

        let mut header = header_from_payload(memblock);
        // SAFETY: `get_pointer_type` just confirmed this is a live header.
        let memory_size = unsafe { header.as_ref().memory_size };

        if count == memory_size {
            // SAFETY: header is valid and unchanged; restamp for parity
            // with the original's no-op-but-still-stamps path.
            unsafe { header.as_mut().restamp() };
            return Some(memblock);
        }
        if count < memory_size {
            // SAFETY: shrinking never escapes the block's existing footprint.
            unsafe {
                header.as_mut().memory_size = count;
                fence::fill_fences(header);
            }
            return Some(memblock);
        }

        // SAFETY: header is valid.
        let next = unsafe { header.as_ref().next };
        match next {
            None => {
                if self.allocate_more_space(header, count) {
                    Some(memblock)
                } else {
                    None
                }
            }
            Some(next_header) => {
                // SAFETY: `next_header` is a valid linked header.
                let (next_free, next_size, next_user_memory) = unsafe {
                    (
                        next_header.as_ref().is_free,
                        next_header.as_ref().memory_size,
                        next_header.as_ref().user_memory,
                    )
                };

                if next_free && memory_size + next_size > count {
                    Some(self.handle_next_block_free(header, count))
                } else if next_free {
                    // SAFETY: computes an address, does not dereference it.
                    let next_payload_end = unsafe {
                        NonNull::new_unchecked(next_user_memory.as_ptr().add(next_size))
                    };
                    // SAFETY: header is valid.
                    let user_memory = unsafe { header.as_ref().user_memory };
                    let reach = block_list::offset_between(Some(user_memory), Some(next_payload_end));
                    if reach > count as i64 {
                        Some(self.handle_next_block_free_and_far(header, count))
                    } else {
                        self.relocate(memblock, memory_size, count)
                    }
                } else {
                    self.relocate(memblock, memory_size, count)
                }
            }
        }
    }

    fn relocate(&mut self, memblock: NonNull<u8>, old_size: usize, count: usize) -> Option<NonNull<u8>> {
        let new_ptr = self.malloc(count)?;
        // SAFETY: `new_ptr` is a fresh, non-overlapping `count`-byte
        // payload; `old_size` bytes of `memblock` are still live.
        unsafe { core::ptr::copy_nonoverlapping(memblock.as_ptr(), new_ptr.as_ptr(), old_size) };
        self.free(Some(memblock));
        let mut new_header = header_from_payload(new_ptr);
        // SAFETY: `new_header` is the header `malloc` just returned.
        unsafe { new_header.as_mut().restamp() };
        Some(new_ptr)
    }

    /// Free a live allocation, eagerly coalescing with free neighbours.
    /// Silently ignores null, an absent region, and any pointer that
    /// isn't a valid payload start.
    pub fn free(&mut self, memblock: Option<NonNull<u8>>) {
        if self.validate() == HeapValidation::RegionAbsent {
            return;
        }
        let Some(memblock) = memblock else { return };
        if self.get_pointer_type(memblock.as_ptr()) != PointerType::Valid {
            return;
        }

        let mut header = header_from_payload(memblock);
        // SAFETY: just confirmed this is a live, valid header.
        unsafe { header.as_mut().is_free = true };
        let next = unsafe { header.as_ref().next };
        let prev = unsafe { header.as_ref().prev };

        let mut working = header;
        if let Some(prev) = prev {
            // SAFETY: `prev` is a valid linked header.
            if unsafe { prev.as_ref().is_free } {
                // SAFETY: preconditions (`working` has a free predecessor) hold.
                working = unsafe { block_list::coalesce_left(working) };
                self.headers_allocated -= 1;
                self.c_sum -= 2 * FENCE_LENGTH as u64;
            }
        }
        if let Some(next) = next {
            // SAFETY: `next` is a valid linked header, unaffected by the
            // left-merge above (only its `prev` link may have changed).
            if unsafe { next.as_ref().is_free } {
                // SAFETY: preconditions (`working` has a free successor) hold.
                unsafe { block_list::coalesce_right(working) };
                self.headers_allocated -= 1;
                self.c_sum -= 2 * FENCE_LENGTH as u64;
            }
        }

        // SAFETY: `working` is valid.
        if let Some(working_next) = unsafe { working.as_ref().next } {
            let dist = block_list::offset_between(Some(working.cast()), Some(working_next.cast()));
            let new_size = (dist - block_list::block_footprint(0) as i64) as usize;
            // SAFETY: `working` is valid and exclusively owned.
            unsafe { working.as_mut().memory_size = new_size };
        }
        // SAFETY: `working` is valid; its extent is now final.
        unsafe { fence::fill_fences(working) };
    }
}
