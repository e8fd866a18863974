//! Layout-stable constants.
//!
//! These values are part of the on-disk/in-memory byte layout (checksum
//! input, fence bytes) and must never become runtime-configurable — doing
//! so would break checksum reproducibility across a running process
//! (spec §9, "Checksum prefix scope").

/// Size of one page, in bytes. The region is always grown/shrunk by whole
/// multiples of this.
pub const PAGE_SIZE: usize = 4096;

/// Width, in bytes, of each of the two canary zones flanking a payload.
pub const FENCE_LENGTH: usize = 4;

/// Canary byte written into the left fence.
pub const LEFT_FENCE_BYTE: u8 = b'f';

/// Canary byte written into the right fence.
pub const RIGHT_FENCE_BYTE: u8 = b'F';

/// DJB2 seed.
pub const CHECKSUM_SEED: u64 = 5381;

/// Fixed per-block metadata cost: header plus both fences.
#[inline]
pub const fn header_overhead() -> usize {
    core::mem::size_of::<crate::header::Header>() + 2 * FENCE_LENGTH
}
