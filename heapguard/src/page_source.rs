//! The page-growth collaborator `spec.md` keeps external to the core.
//!
//! `Region`/`Heap` never talks to the OS directly; it asks a `PageSource`
//! to grow or shrink a contiguous span. This is the one seam through
//! which the allocator is parameterized over its host environment
//! (spec.md §9, "Process-wide singleton" redesign note).

/// A contiguous, page-granular region provider, modeled after `sbrk`.
///
/// # Safety
///
/// Implementors must guarantee:
/// - every successful `adjust` call returns memory contiguous with and
///   immediately following whatever was returned by prior successful
///   calls (the core assumes one unbroken span that only grows at the
///   high end and shrinks from the high end);
/// - the returned base address never changes across calls once a region
///   has been established;
/// - a failed call (`None`) leaves the region exactly as it was.
pub unsafe trait PageSource {
    /// Grow (`delta_pages > 0`) or shrink (`delta_pages < 0`) the region
    /// by `delta_pages` pages. Returns the break address *before* the
    /// adjustment on success (the sbrk convention), or `None` on failure.
    fn adjust(&mut self, delta_pages: isize) -> Option<usize>;
}
