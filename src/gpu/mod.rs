//! GPU-side views over a shared allocation.
//!
//! The [`GpuDevice`] trait is the backend seam: it answers the two layout
//! queries the planner needs (heap sizing and linear-texture row alignment)
//! and performs the two no-copy construction steps (buffer wrap and texture
//! view). The in-tree [`SoftwareDevice`] validates the same rules a hardware
//! backend would enforce; tests inject failing doubles through the trait.
//!
//! Ownership: [`GpuBuffer`] is the sole deallocation owner of the raw
//! allocation it wraps. [`GpuTexture`] is a non-owning view and must not
//! outlive its buffer.

mod device;

pub use device::{GpuDevice, SoftwareDevice};

use crate::format::GpuPixelFormat;
use crate::memory::PageAllocation;
use std::ptr::NonNull;

/// Size and alignment pair reported by a heap sizing query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeAlign {
    /// Minimum byte size for heap placement.
    pub size: usize,
    /// Required alignment in bytes.
    pub align: usize,
}

/// Texture usage capability flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureUsage {
    /// Sampled or read in shaders.
    pub shader_read: bool,
    /// Written from shaders.
    pub shader_write: bool,
    /// Bound as a render target.
    pub render_target: bool,
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self {
            shader_read: true,
            shader_write: false,
            render_target: false,
        }
    }
}

impl TextureUsage {
    /// Read-only sampling, the common case for shared frames.
    pub fn sampled() -> Self {
        Self::default()
    }

    /// Read-write shader access.
    pub fn read_write() -> Self {
        Self {
            shader_read: true,
            shader_write: true,
            render_target: false,
        }
    }
}

/// Where texture storage lives relative to the CPU.
///
/// Resolved once at startup from a capability probe and injected into the
/// texture descriptor; never a compile-time branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Unified memory visible to CPU and GPU at the same address.
    #[default]
    Shared,
    /// Discrete memory with explicit CPU/GPU transfer.
    Managed,
}

impl StorageMode {
    /// Probe the host for the storage mode shared buffers should use.
    ///
    /// Buffers that alias CPU views require unified addressing, so the probe
    /// answers `Shared` wherever the host can map one region for both sides.
    pub fn probe() -> Self {
        StorageMode::Shared
    }
}

/// Description of a 2D texture to size or construct.
#[derive(Clone, Copy, Debug)]
pub struct TextureDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in rows.
    pub height: u32,
    /// Pixel format.
    pub format: GpuPixelFormat,
    /// Capability flags.
    pub usage: TextureUsage,
    /// Storage placement.
    pub storage: StorageMode,
}

/// GPU buffer wrapping a raw allocation without copying.
///
/// The buffer is the designated deallocation owner: dropping it runs the
/// allocation's deallocator exactly once. Every other view of the same bytes
/// is a weak alias that must be kept from outliving this buffer.
#[derive(Debug)]
pub struct GpuBuffer {
    allocation: PageAllocation,
}

impl GpuBuffer {
    pub(crate) fn new(allocation: PageAllocation) -> Self {
        Self { allocation }
    }

    /// Base address of the wrapped region.
    #[inline]
    pub fn contents(&self) -> NonNull<u8> {
        self.allocation.base()
    }

    /// Byte length of the wrapped region.
    #[inline]
    pub fn len(&self) -> usize {
        self.allocation.len()
    }

    /// Returns true if the buffer has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allocation.is_empty()
    }
}

/// Texture view over a [`GpuBuffer`] at an explicit row stride.
///
/// Non-owning: holds the base address and geometry only. Valid for the
/// lifetime of the buffer it was constructed from.
#[derive(Debug)]
pub struct GpuTexture {
    base: NonNull<u8>,
    width: u32,
    height: u32,
    row_stride: usize,
    format: GpuPixelFormat,
}

impl GpuTexture {
    pub(crate) fn new(
        base: NonNull<u8>,
        width: u32,
        height: u32,
        row_stride: usize,
        format: GpuPixelFormat,
    ) -> Self {
        Self {
            base,
            width,
            height,
            row_stride,
            format,
        }
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in rows.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between consecutive rows.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Pixel format.
    #[inline]
    pub fn format(&self) -> GpuPixelFormat {
        self.format
    }

    /// Base address of the first row.
    #[inline]
    pub fn base_address(&self) -> *mut u8 {
        self.base.as_ptr()
    }
}

// SAFETY: GpuTexture is a pointer-plus-geometry view. The pointee is owned
// by the GpuBuffer the texture was built over, and byte access requires
// external synchronization regardless of which thread holds the view.
unsafe impl Send for GpuTexture {}
unsafe impl Sync for GpuTexture {}
