//! # sharedframe
//!
//! One allocation, three views: a GPU-addressable texture, a CPU-addressable
//! pixel buffer, and a vectorized-image-processing (SIMD) buffer, all
//! aliasing the same page-aligned memory region with zero copies.
//!
//! The hard part is the layout: three independent subsystems (the GPU heap
//! allocator, the GPU's linear-texture rules, and the SIMD library) each
//! impose their own size and alignment requirements. sharedframe collects
//! all three, computes a single allocation that satisfies the strictest of
//! every requirement, and builds the views with one designated owner so the
//! region is released exactly once.
//!
//! ## Quick Start
//!
//! ```rust
//! use sharedframe::prelude::*;
//!
//! let shared = SharedGraphicsBuffer::new(
//!     &SoftwareDevice,
//!     &SoftwareSimd,
//!     &SystemPageAllocator,
//!     &BufferRequest::new(1920, 1080, GpuPixelFormat::Bgra8Unorm),
//! )?;
//!
//! // All three views agree on geometry and address.
//! assert_eq!(shared.texture().row_stride(), shared.simd().row_bytes());
//!
//! // CPU access goes through the lock/unlock contract.
//! let locked = shared.pixels().lock();
//! let _base = locked.base_address();
//! # Ok::<(), sharedframe::Error>(())
//! ```
//!
//! Construction is synchronous and all-or-nothing: on any failure every
//! intermediate resource is released before the error reaches the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod alignment;
pub mod buffer;
pub mod error;
pub mod format;
pub mod gpu;
pub mod memory;
pub mod plan;
pub mod simd;
pub mod surface;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::buffer::{CpuPixelBuffer, LockedPixels, SharedGraphicsBuffer};
    pub use crate::error::{Error, Result};
    pub use crate::format::{CpuPixelFormat, GpuPixelFormat};
    pub use crate::gpu::{GpuDevice, SoftwareDevice, TextureUsage};
    pub use crate::memory::{PageAllocator, SystemPageAllocator};
    pub use crate::plan::BufferRequest;
    pub use crate::simd::{SimdImaging, SoftwareSimd};
}

pub use error::{Error, Result};
