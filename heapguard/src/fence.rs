//! Canary writes and the global fence-byte census.
//!
//! Every mutation that changes a block's extent re-derives both fences
//! from the header's current `memory_size` and re-stamps the checksum in
//! the same stroke — the two are never allowed to drift apart.

use core::ptr::NonNull;

use crate::header::Header;
use crate::layout::{FENCE_LENGTH, LEFT_FENCE_BYTE, RIGHT_FENCE_BYTE};

/// Write both canary zones for `header` and restamp its checksum.
///
/// # Safety
///
/// `header` must point at a fully initialized header whose `memory_size`
/// and `user_memory` already describe the block's current extent, with
/// both fence zones inside memory owned by the region.
pub unsafe fn fill_fences(mut header: NonNull<Header>) {
    let left = Header::left_fence_ptr(header);
    // SAFETY: `left` is `FENCE_LENGTH` bytes of writable block memory,
    // guaranteed by the caller.
    unsafe { left.as_ptr().write_bytes(LEFT_FENCE_BYTE, FENCE_LENGTH) };

    let right = header.as_ref().right_fence_ptr();
    // SAFETY: same guarantee, for the right-hand zone.
    unsafe { right.as_ptr().write_bytes(RIGHT_FENCE_BYTE, FENCE_LENGTH) };

    header.as_mut().restamp();
}

/// Count how many of the `2 * FENCE_LENGTH` canary bytes around every
/// live header still hold their expected value. Compared against
/// `heap.c_sum` by the validator as the global integrity predicate.
///
/// # Safety
///
/// Every header reachable from `head` via `next` must be valid and fully
/// initialized, and its fence zones must lie in readable memory.
pub unsafe fn count_fences(head: Option<NonNull<Header>>) -> u64 {
    let mut sum: u64 = 0;
    let mut current = head;
    while let Some(header) = current {
        // SAFETY: caller guarantees every linked header is valid.
        let header_ref = unsafe { header.as_ref() };
        let left = Header::left_fence_ptr(header);
        let right = header_ref.right_fence_ptr();
        for i in 0..FENCE_LENGTH {
            // SAFETY: both zones are within the block per header invariants.
            if unsafe { *left.as_ptr().add(i) } == LEFT_FENCE_BYTE {
                sum += 1;
            }
            if unsafe { *right.as_ptr().add(i) } == RIGHT_FENCE_BYTE {
                sum += 1;
            }
        }
        current = header_ref.next;
    }
    sum
}
