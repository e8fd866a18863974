//! The intrusive block header.
//!
//! Field order is fixed and `#[repr(C)]`: the checksum covers the exact
//! byte prefix up to (excluding) `c_sum`, so reordering fields changes
//! what gets hashed (spec §3, §9 "Checksum prefix scope").

use core::ptr::NonNull;

use crate::checksum;
use crate::layout::FENCE_LENGTH;

#[repr(C)]
pub struct Header {
    pub prev: Option<NonNull<Header>>,
    pub next: Option<NonNull<Header>>,
    pub memory_size: usize,
    pub is_free: bool,
    pub user_memory: NonNull<u8>,
    pub c_sum: u64,
}

impl Header {
    /// Byte offset of `c_sum` within the struct — the checksum covers
    /// everything before it.
    const CHECKSUM_PREFIX_LEN: usize = core::mem::offset_of!(Header, c_sum);

    #[inline]
    fn prefix_bytes(&self) -> &[u8] {
        // SAFETY: `self` is a valid `&Header`; the prefix is entirely
        // within the struct and contains no padding past `c_sum` because
        // `c_sum` is the last declared field.
        unsafe {
            core::slice::from_raw_parts(
                (self as *const Header).cast::<u8>(),
                Self::CHECKSUM_PREFIX_LEN,
            )
        }
    }

    /// Recompute and store the checksum over the current field values.
    #[inline]
    pub fn restamp(&mut self) {
        self.c_sum = checksum::djb2(self.prefix_bytes());
    }

    /// Whether the stored checksum matches the current field values.
    #[inline]
    pub fn checksum_valid(&self) -> bool {
        checksum::djb2(self.prefix_bytes()) == self.c_sum
    }

    /// Address immediately after the header — the start of the left fence.
    #[inline]
    pub fn left_fence_ptr(header: NonNull<Header>) -> NonNull<u8> {
        // SAFETY: `header + size_of::<Header>()` stays within the block
        // that the caller guarantees `header` is the start of.
        unsafe { NonNull::new_unchecked(header.as_ptr().cast::<u8>().add(core::mem::size_of::<Header>())) }
    }

    /// Address of the right fence, derived from the stored payload size.
    #[inline]
    pub fn right_fence_ptr(&self) -> NonNull<u8> {
        // SAFETY: `user_memory + memory_size` stays within the block.
        unsafe { NonNull::new_unchecked(self.user_memory.as_ptr().add(self.memory_size)) }
    }

    /// Address one byte past the right fence — where the next block (if
    /// any) must begin, per invariant 1.
    #[inline]
    pub fn block_end_ptr(&self) -> NonNull<u8> {
        let right_fence = self.right_fence_ptr();
        // SAFETY: stays within the block plus its trailing fence.
        unsafe { NonNull::new_unchecked(right_fence.as_ptr().add(FENCE_LENGTH)) }
    }
}

/// Per-block metadata cost: header struct plus both fences.
pub const HEADER_STRUCT_SIZE: usize = core::mem::size_of::<Header>();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_prefix_excludes_c_sum_field() {
        let mut backing = 0u8;
        let mut h = Header {
            prev: None,
            next: None,
            memory_size: 128,
            is_free: false,
            user_memory: NonNull::from(&mut backing),
            c_sum: 0,
        };
        h.restamp();
        let stamped = h.c_sum;
        assert!(h.checksum_valid());
        // Mutating c_sum directly must not affect whether prefix bytes match.
        h.c_sum = stamped.wrapping_add(1);
        assert!(!h.checksum_valid());
    }
}
