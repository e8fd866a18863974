//! A corruption-detecting first-fit allocator over a contiguous,
//! page-granular region.
//!
//! Every block carries a header, two fence zones, and a rolling checksum;
//! `heap_validate`/`get_pointer_type` let a caller ask the allocator
//! whether it — or the memory surrounding a given pointer — is still
//! intact. See [`region::Heap`] for the entry point and [`PageSource`]
//! for how the region actually grows.
#![no_std]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod block_list;
pub mod checksum;
pub mod fence;
pub mod header;
pub mod layout;
pub mod page_source;
mod policy;
pub mod region;
pub mod test_support;
pub mod validator;

#[cfg(feature = "std")]
pub mod global;
#[cfg(feature = "std")]
pub mod platform;

pub use header::Header;
pub use page_source::PageSource;
pub use region::Heap;
pub use validator::{BlockIter, BlockSnapshot, HeapValidation, PointerType};
