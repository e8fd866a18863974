//! Property-based tests: random `malloc`/`realloc`/`free` sequences must
//! leave the heap valid and structurally sound after every step.

use heapguard::HeapValidation;
use heapguard_tests::fresh_heap;
use proptest::collection;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Malloc(usize),
    Free,
    Realloc(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1usize..256).prop_map(Op::Malloc),
        2 => Just(Op::Free),
        2 => (1usize..256).prop_map(Op::Realloc),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn random_operation_sequences_preserve_invariants(
        ops in collection::vec(op_strategy(), 0..60)
    ) {
        let mut heap = fresh_heap(128);
        let mut live: Vec<(std::ptr::NonNull<u8>, usize)> = Vec::new();

        for op in ops {
            match op {
                Op::Malloc(size) => {
                    if let Some(p) = heap.malloc(size) {
                        // SAFETY: `p` is a fresh, exclusively-owned `size`-byte payload.
                        unsafe { p.as_ptr().write_bytes(0xAB, size) };
                        live.push((p, size));
                    }
                }
                Op::Free => {
                    if !live.is_empty() {
                        let (p, _) = live.remove(0);
                        heap.free(Some(p));
                    }
                }
                Op::Realloc(new_size) => {
                    if !live.is_empty() {
                        let (p, old_size) = live.remove(0);
                        // SAFETY: `p` is still a live, exclusively-owned payload
                        // of `old_size` bytes at this point.
                        let before = unsafe { std::slice::from_raw_parts(p.as_ptr(), old_size) }.to_vec();
                        if let Some(q) = heap.realloc(Some(p), new_size) {
                            let keep = old_size.min(new_size);
                            // SAFETY: `q` is the live payload `realloc` just returned,
                            // at least `keep` bytes long.
                            let after = unsafe { std::slice::from_raw_parts(q.as_ptr(), keep) };
                            prop_assert_eq!(&before[..keep], after);
                            live.push((q, new_size));
                        }
                    }
                }
            }

            // Invariant 1: every operation leaves the heap valid.
            prop_assert_eq!(heap.validate(), HeapValidation::Ok);

            // Invariants 2 & 3: strict address adjacency, no two adjacent
            // free blocks.
            let snapshots: Vec<_> = heap.blocks().collect();
            for pair in snapshots.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert_eq!(
                    b.address - a.address,
                    heapguard::layout::header_overhead() + a.memory_size
                );
                prop_assert!(
                    !(a.is_free && b.is_free),
                    "adjacent free blocks should have been coalesced"
                );
            }
        }
    }
}
