//! The shared graphics buffer handle.
//!
//! [`SharedGraphicsBuffer`] is one page-aligned allocation exposed through
//! three aliased views: a GPU texture, a CPU pixel buffer, and a SIMD buffer
//! descriptor. No bytes are copied; every view is told the same base
//! address, dimensions, and row stride.
//!
//! # Ownership
//!
//! Exactly one view, the GPU buffer, owns the raw allocation and releases it
//! exactly once when dropped. The texture, CPU, and SIMD views are weak
//! aliases. The handle keeps the owning buffer alive as long as any alias is
//! reachable, and its fields are declared so the aliases drop before the
//! owner.

use crate::error::{Error, Result};
use crate::format::{CpuPixelFormat, GpuPixelFormat};
use crate::gpu::{GpuBuffer, GpuDevice, GpuTexture, StorageMode};
use crate::memory::PageAllocator;
use crate::plan::{AllocationPlan, BufferRequest, LayoutConstraints};
use crate::simd::{SimdBuffer, SimdImaging};
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Capability flags carried by a CPU pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompatibilityFlags {
    /// Readable and writable from the CPU.
    pub cpu_readable: bool,
    /// Usable as GPU texture backing.
    pub gpu_readable: bool,
    /// Usable as a bitmap-context target.
    pub bitmap_compatible: bool,
}

impl Default for CompatibilityFlags {
    fn default() -> Self {
        Self {
            cpu_readable: true,
            gpu_readable: true,
            bitmap_compatible: true,
        }
    }
}

/// CPU-addressable pixel buffer over shared bytes.
///
/// Non-owning: carries no release callback; the GPU buffer aliasing the same
/// allocation is the sole owner. Reports the same geometry as the GPU view.
#[derive(Debug)]
pub struct CpuPixelBuffer {
    base: NonNull<u8>,
    width: u32,
    height: u32,
    row_stride: usize,
    // row_stride * height, validated against the allocation size at plan
    // time; stored so locked access never redoes the multiplication.
    data_len: usize,
    format: CpuPixelFormat,
    flags: CompatibilityFlags,
    lock: Mutex<()>,
}

impl CpuPixelBuffer {
    fn new(
        base: NonNull<u8>,
        width: u32,
        height: u32,
        row_stride: usize,
        data_len: usize,
        format: CpuPixelFormat,
        flags: CompatibilityFlags,
    ) -> Self {
        Self {
            base,
            width,
            height,
            row_stride,
            data_len,
            format,
            flags,
            lock: Mutex::new(()),
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

    /// CPU-side pixel format tag.
    #[inline]
    pub fn format(&self) -> CpuPixelFormat {
        self.format
    }

    /// Capability flags.
    #[inline]
    pub fn flags(&self) -> CompatibilityFlags {
        self.flags
    }

    /// Acquire the base address under the buffer's access lock.
    ///
    /// Callers reading pixel data must bracket base-address and metadata
    /// retrieval with this guard so they never observe a layout mid-mutation
    /// from the GPU side. The guard is the whole contract: no cross-device
    /// memory barrier is issued.
    pub fn lock(&self) -> LockedPixels<'_> {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        LockedPixels {
            buffer: self,
            _guard: guard,
        }
    }
}

// SAFETY: Pointer-plus-geometry view over bytes owned by the GPU buffer in
// the same handle. The access lock serializes base-address retrieval;
// concurrent byte access is the caller's discipline.
unsafe impl Send for CpuPixelBuffer {}
unsafe impl Sync for CpuPixelBuffer {}

/// RAII guard for locked CPU pixel access.
pub struct LockedPixels<'a> {
    buffer: &'a CpuPixelBuffer,
    _guard: MutexGuard<'a, ()>,
}

impl LockedPixels<'_> {
    /// Base address of the first row, valid while the guard is held.
    #[inline]
    pub fn base_address(&self) -> *mut u8 {
        self.buffer.base.as_ptr()
    }

    /// Bytes between consecutive rows.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.buffer.row_stride
    }

    /// View the pixel rows as bytes.
    ///
    /// # Safety
    ///
    /// The caller must ensure the GPU side is not concurrently writing the
    /// region; the lock covers CPU-side access only.
    pub unsafe fn as_slice(&self) -> &[u8] {
        // SAFETY: data_len was validated against the allocation size when
        // the plan was computed; caller upholds the access discipline.
        unsafe { std::slice::from_raw_parts(self.buffer.base.as_ptr(), self.buffer.data_len) }
    }
}

/// One allocation, three views.
///
/// Built by [`SharedGraphicsBuffer::new`]; either every view is valid and
/// consistent, or construction fails with no resource leaked.
#[derive(Debug)]
pub struct SharedGraphicsBuffer {
    width: u32,
    height: u32,
    row_stride: usize,
    gpu_format: GpuPixelFormat,
    cpu_format: CpuPixelFormat,
    // Aliasing views are declared before the owning buffer so drop order
    // releases every alias before the allocation itself.
    texture: GpuTexture,
    pixels: CpuPixelBuffer,
    simd: SimdBuffer,
    buffer: GpuBuffer,
}

impl SharedGraphicsBuffer {
    /// Construct a shared buffer for the requested geometry and format.
    ///
    /// Pipeline: format lookup (fail fast, zero side effects) → constraint
    /// collection (pure queries) → allocation plan → page-aligned raw
    /// allocation → GPU buffer wrap → texture view → CPU and SIMD views.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedPixelFormat`] when the format has no layout
    /// descriptor; [`Error::InitializationFailed`] when any allocation or
    /// view-construction step is rejected, or when the requested geometry's
    /// byte extent does not fit in the address space. On every failure path
    /// the raw allocation and any wrapped buffer are released before the
    /// error propagates.
    pub fn new(
        device: &dyn GpuDevice,
        simd: &dyn SimdImaging,
        allocator: &dyn PageAllocator,
        request: &BufferRequest,
    ) -> Result<Self> {
        // Configuration check before any resource is touched.
        let layout = request
            .format
            .descriptor()
            .ok_or(Error::UnsupportedPixelFormat(request.format))?;

        let storage = StorageMode::probe();
        let constraints = LayoutConstraints::collect(
            device,
            simd,
            allocator.page_size(),
            request,
            &layout,
            storage,
        )?;
        let plan = AllocationPlan::compute(request, &layout, &constraints)?;
        let data_len = plan
            .row_stride
            .checked_mul(plan.height as usize)
            .ok_or_else(|| {
                Error::InitializationFailed(
                    "buffer byte length overflows the address space".into(),
                )
            })?;

        tracing::debug!(
            width = plan.width,
            height = plan.height,
            row_stride = plan.row_stride,
            total_size = plan.total_size,
            alignment = plan.alignment,
            format = ?request.format,
            "allocating shared graphics buffer"
        );

        // From here on, every acquired resource is released by drop if a
        // later step fails.
        let allocation = allocator.allocate(plan.total_size)?;
        let base = allocation.base();

        let desc = request.texture_descriptor(storage);
        let buffer = device.buffer_no_copy(allocation)?;
        let texture = device.texture_from_buffer(&buffer, &desc, plan.row_stride)?;

        let pixels = CpuPixelBuffer::new(
            base,
            plan.width,
            plan.height,
            plan.row_stride,
            data_len,
            layout.cpu_format,
            CompatibilityFlags::default(),
        );
        let simd_view = SimdBuffer::new(base, plan.width, plan.height, plan.row_stride);

        debug_assert_eq!(texture.base_address(), pixels.base.as_ptr());
        debug_assert_eq!(texture.row_stride(), simd_view.row_bytes());

        Ok(Self {
            width: plan.width,
            height: plan.height,
            row_stride: plan.row_stride,
            gpu_format: request.format,
            cpu_format: layout.cpu_format,
            texture,
            pixels,
            simd: simd_view,
            buffer,
        })
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

    /// Bytes between consecutive rows, identical for all three views.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Base address shared by all three views.
    #[inline]
    pub fn base_address(&self) -> *mut u8 {
        self.buffer.contents().as_ptr()
    }

    /// GPU-side pixel format tag.
    #[inline]
    pub fn gpu_format(&self) -> GpuPixelFormat {
        self.gpu_format
    }

    /// CPU-side pixel format tag.
    #[inline]
    pub fn cpu_format(&self) -> CpuPixelFormat {
        self.cpu_format
    }

    /// The GPU texture view.
    #[inline]
    pub fn texture(&self) -> &GpuTexture {
        &self.texture
    }

    /// The CPU pixel-buffer view.
    #[inline]
    pub fn pixels(&self) -> &CpuPixelBuffer {
        &self.pixels
    }

    /// The SIMD buffer descriptor.
    #[inline]
    pub fn simd(&self) -> &SimdBuffer {
        &self.simd
    }

    /// The owning GPU buffer.
    #[inline]
    pub fn gpu_buffer(&self) -> &GpuBuffer {
        &self.buffer
    }
}
