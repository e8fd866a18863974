//! DJB2-family rolling checksum over a header's byte prefix.
//!
//! The same hash is used to stamp a header after every mutation and to
//! verify every live header during `heap_validate`. The seed and step are
//! part of the external layout (spec §6) and must not change.

use crate::layout::CHECKSUM_SEED;

/// `hash = (hash << 5) + hash + byte`, i.e. `hash = hash * 33 + byte`.
#[inline]
pub fn djb2(bytes: &[u8]) -> u64 {
    let mut hash = CHECKSUM_SEED;
    for &byte in bytes {
        hash = (hash << 5).wrapping_add(hash).wrapping_add(byte as u64);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_with_no_bytes_is_unchanged() {
        assert_eq!(djb2(&[]), CHECKSUM_SEED);
    }

    #[test]
    fn deterministic_over_same_bytes() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(djb2(&data), djb2(&data));
    }

    #[test]
    fn sensitive_to_single_byte_change() {
        let a = [1u8, 2, 3, 4];
        let b = [1u8, 2, 3, 5];
        assert_ne!(djb2(&a), djb2(&b));
    }
}
