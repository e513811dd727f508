//! Raw page-aligned allocations for shared graphics buffers.
//!
//! One [`PageAllocation`] backs all three views of a shared buffer. The
//! allocation carries its deallocator with it, so whichever object ends up
//! holding the allocation releases it exactly once on drop, on both success
//! and error paths.

mod page;

pub use page::{PageAllocation, PageAllocator, SystemPageAllocator};
