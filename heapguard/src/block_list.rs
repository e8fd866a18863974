//! The intrusive doubly-linked list of block headers, in address order.
//!
//! Every function here operates purely on header pointers; none of them
//! touch the owning heap's running totals (`headers_allocated`, `c_sum`).
//! Callers in [`crate::policy`] and [`crate::region`] are responsible for
//! updating those after a structural change, mirroring the split between
//! the list-shape primitives and the bookkeeping that wraps them.

use core::ptr::NonNull;

use crate::fence::fill_fences;
use crate::header::{Header, HEADER_STRUCT_SIZE};
use crate::layout::FENCE_LENGTH;

/// Total physical footprint of a block carrying `payload_size` bytes of
/// user data: header + both fences + payload.
#[inline]
pub fn block_footprint(payload_size: usize) -> usize {
    HEADER_STRUCT_SIZE + payload_size + 2 * FENCE_LENGTH
}

/// Checked variant used at the public API boundary, where an
/// attacker-sized or simply huge `size` must be rejected rather than let
/// the footprint computation wrap.
#[inline]
pub fn checked_block_footprint(payload_size: usize) -> Option<usize> {
    HEADER_STRUCT_SIZE
        .checked_add(payload_size)
        .and_then(|s| s.checked_add(2 * FENCE_LENGTH))
}

/// Signed byte distance from `begin` to `end`, or `0` if either is absent
/// — the original's `calc_ptr_distance_in_bytes`, whose null-handling
/// `policy::realloc`'s reach computation and `free`'s post-coalesce
/// resize both depend on.
#[inline]
pub fn offset_between(begin: Option<NonNull<u8>>, end: Option<NonNull<u8>>) -> i64 {
    match (begin, end) {
        (Some(b), Some(e)) => e.as_ptr() as i64 - b.as_ptr() as i64,
        _ => 0,
    }
}

/// Initialize `header` as a used block of `mem_size` bytes, splice it
/// between `prev` and `next`, fill its fences, and re-stamp every header
/// whose linkage changed.
///
/// # Safety
///
/// `header` must reference writable memory large enough for
/// `block_footprint(mem_size)` bytes; `prev`/`next`, if present, must
/// already be valid linked headers.
pub unsafe fn set_header(
    mut header: NonNull<Header>,
    mem_size: usize,
    prev: Option<NonNull<Header>>,
    next: Option<NonNull<Header>>,
) {
    let user_memory = Header::left_fence_ptr(header);
    // SAFETY: `user_memory + FENCE_LENGTH` stays within the caller-guaranteed span.
    let user_memory = unsafe { NonNull::new_unchecked(user_memory.as_ptr().add(FENCE_LENGTH)) };

    // SAFETY: `header` is writable per caller contract.
    unsafe {
        header.as_mut().is_free = false;
        header.as_mut().memory_size = mem_size;
        header.as_mut().prev = prev;
        header.as_mut().next = next;
        header.as_mut().user_memory = user_memory;
    }

    if let Some(mut next) = next {
        // SAFETY: caller guarantees `next` is a valid linked header.
        unsafe {
            next.as_mut().prev = Some(header);
            next.as_mut().restamp();
        }
    }
    if let Some(mut prev) = prev {
        // SAFETY: caller guarantees `prev` is a valid linked header.
        unsafe {
            prev.as_mut().next = Some(header);
            prev.as_mut().restamp();
        }
    }

    // SAFETY: fence zones are within the footprint the caller reserved.
    unsafe { fill_fences(header) };
}

/// Shrink `header_to_reduce` to `new_mem_size` and carve the residual
/// bytes into a fresh free header immediately following it.
///
/// Precondition: `header_to_reduce.memory_size > block_footprint(new_mem_size) + 1`
/// (enforced by callers in [`crate::policy`], not re-checked here).
///
/// # Safety
///
/// `header_to_reduce` must be a valid linked header with enough backing
/// memory for its current `memory_size`.
pub unsafe fn split(mut header_to_reduce: NonNull<Header>, new_mem_size: usize) {
    // SAFETY: caller guarantees a valid header.
    let old_size = unsafe { header_to_reduce.as_ref().memory_size };
    let old_next = unsafe { header_to_reduce.as_ref().next };
    let remaining_size = old_size - block_footprint(new_mem_size);

    unsafe {
        header_to_reduce.as_mut().memory_size = new_mem_size;
        header_to_reduce.as_mut().is_free = false;
        fill_fences(header_to_reduce);
    }

    let user_memory = unsafe { header_to_reduce.as_ref().user_memory };
    // SAFETY: lands exactly after the shrunk block's right fence, within
    // the footprint the precondition guarantees is still ours.
    let new_header = unsafe {
        NonNull::new_unchecked(
            user_memory
                .as_ptr()
                .add(new_mem_size + FENCE_LENGTH)
                .cast::<Header>(),
        )
    };

    // SAFETY: `new_header` is freshly carved, writable memory; `old_next`
    // (if any) is still a valid linked header.
    let mut new_header = new_header;
    unsafe {
        set_header(new_header, remaining_size, Some(header_to_reduce), old_next);
        new_header.as_mut().is_free = true;

        header_to_reduce.as_mut().next = Some(new_header);
        new_header.as_mut().restamp();
        header_to_reduce.as_mut().restamp();
    }

    #[cfg(feature = "logging")]
    log::trace!("split block into {new_mem_size} + {remaining_size} bytes");
}

/// Merge `current` with its successor `current.next`. Returns the removed
/// header's former fence/bookkeeping cost (`2 * FENCE_LENGTH`) so the
/// caller can adjust the owning heap's running `c_sum`.
///
/// Precondition: `current.next` is `Some` and free. Not re-checked here.
///
/// # Safety
///
/// `current` and `current.next` must be valid linked headers.
pub unsafe fn coalesce_right(mut current: NonNull<Header>) {
    // SAFETY: caller guarantees `current` is valid and has a successor.
    let next = unsafe { current.as_ref().next.expect("coalesce_right precondition") };
    let next_size = unsafe { next.as_ref().memory_size };
    let next_next = unsafe { next.as_ref().next };

    unsafe {
        current.as_mut().memory_size += block_footprint(next_size);
        current.as_mut().next = next_next;
    }

    if let Some(mut next_next) = next_next {
        // SAFETY: still a valid linked header.
        unsafe {
            next_next.as_mut().prev = Some(current);
            next_next.as_mut().restamp();
        }
    }
    // SAFETY: `current` was just mutated in place above.
    unsafe { current.as_mut().restamp() };

    #[cfg(feature = "logging")]
    log::trace!("coalesced block with its right neighbor");
}

/// Merge `current` into its predecessor `current.prev`, returning the
/// surviving header.
///
/// Precondition: `current.prev` is `Some` and free. Not re-checked here.
///
/// # Safety
///
/// `current` and `current.prev` must be valid linked headers.
pub unsafe fn coalesce_left(mut current: NonNull<Header>) -> NonNull<Header> {
    // SAFETY: caller guarantees `current` is valid and has a predecessor.
    let mut prev = unsafe { current.as_ref().prev.expect("coalesce_left precondition") };
    let current_size = unsafe { current.as_ref().memory_size };
    let current_next = unsafe { current.as_ref().next };

    unsafe {
        prev.as_mut().memory_size += block_footprint(current_size);
        prev.as_mut().next = current_next;
    }

    if let Some(mut current_next) = current_next {
        // SAFETY: still a valid linked header.
        unsafe {
            current_next.as_mut().prev = Some(prev);
            current_next.as_mut().restamp();
        }
    }
    // SAFETY: `current`'s memory is still valid even though it is being
    // retired; the original restamps it too before it is overwritten by
    // a future allocation.
    unsafe { current.as_mut().restamp() };
    unsafe { prev.as_mut().restamp() };

    #[cfg(feature = "logging")]
    log::trace!("coalesced block with its left neighbor");

    prev
}
