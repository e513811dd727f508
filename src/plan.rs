//! Constraint collection and allocation planning.
//!
//! Three subsystems each impose a layout requirement on a shared buffer: the
//! GPU heap sizing query, the GPU linear-texture row alignment, and the SIMD
//! library's data alignment. [`LayoutConstraints::collect`] gathers all
//! three without allocating; [`AllocationPlan::compute`] folds them into one
//! layout that satisfies the strictest requirement of every consumer
//! simultaneously.

use crate::alignment::{checked_align_up, checked_row_stride};
use crate::error::{Error, Result};
use crate::format::{FormatDescriptor, GpuPixelFormat};
use crate::gpu::{GpuDevice, SizeAlign, StorageMode, TextureDescriptor, TextureUsage};
use crate::simd::SimdImaging;

/// A request to construct a shared graphics buffer.
#[derive(Clone, Copy, Debug)]
pub struct BufferRequest {
    /// Width in pixels. Must be positive.
    pub width: u32,
    /// Height in rows. Must be positive.
    pub height: u32,
    /// GPU pixel format.
    pub format: GpuPixelFormat,
    /// Intended texture usage.
    pub usage: TextureUsage,
}

impl BufferRequest {
    /// Create a request with default (sampled) usage.
    pub fn new(width: u32, height: u32, format: GpuPixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            usage: TextureUsage::sampled(),
        }
    }

    /// Texture descriptor for this request under the given storage mode.
    pub fn texture_descriptor(&self, storage: StorageMode) -> TextureDescriptor {
        TextureDescriptor {
            width: self.width,
            height: self.height,
            format: self.format,
            usage: self.usage,
            storage,
        }
    }
}

/// Requirements gathered from the three downstream subsystems.
#[derive(Clone, Copy, Debug)]
pub struct LayoutConstraints {
    /// GPU heap sizing for the requested texture.
    pub heap: SizeAlign,
    /// Minimum row alignment for texture-from-buffer construction.
    pub texture_row_alignment: usize,
    /// Minimum data alignment required by the SIMD library.
    pub simd_alignment: usize,
    /// Host virtual-memory page size.
    pub page_size: usize,
}

impl LayoutConstraints {
    /// Query each subsystem for its requirement. Pure queries; nothing here
    /// allocates.
    pub fn collect(
        device: &dyn GpuDevice,
        simd: &dyn SimdImaging,
        page_size: usize,
        request: &BufferRequest,
        layout: &FormatDescriptor,
        storage: StorageMode,
    ) -> Result<Self> {
        if request.width == 0 || request.height == 0 {
            return Err(Error::InitializationFailed(format!(
                "dimensions must be positive, got {}x{}",
                request.width, request.height
            )));
        }

        let desc = request.texture_descriptor(storage);
        let heap = device.heap_texture_size_and_align(&desc)?;
        let texture_row_alignment = device.linear_texture_alignment(request.format)?;
        let simd_alignment =
            simd.required_alignment(request.width, request.height, layout.bits_per_component)?;

        if texture_row_alignment == 0 || simd_alignment == 0 || heap.align == 0 || page_size == 0 {
            return Err(Error::InitializationFailed(
                "subsystem reported a zero alignment".into(),
            ));
        }
        // The raw allocation's base address is page-aligned and nothing
        // more; a heap alignment the page size does not cover cannot be
        // satisfied.
        if heap.align > page_size || page_size % heap.align != 0 {
            return Err(Error::InitializationFailed(format!(
                "heap alignment {} is not satisfied by page-aligned allocations (page size {page_size})",
                heap.align
            )));
        }

        Ok(Self {
            heap,
            texture_row_alignment,
            simd_alignment,
            page_size,
        })
    }
}

/// The layout a shared allocation will use. Derived, immutable.
///
/// Invariants, checked at computation time:
/// - `row_stride >= width * element_size`
/// - `row_stride % alignment == 0`
/// - `total_size % page_size == 0`
/// - `total_size >= heap.size`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationPlan {
    /// Requested width in pixels.
    pub width: u32,
    /// Requested height in rows.
    pub height: u32,
    /// Bytes between consecutive rows.
    pub row_stride: usize,
    /// Total allocation size in bytes, page-rounded.
    pub total_size: usize,
    /// Row alignment the stride satisfies.
    pub alignment: usize,
}

impl AllocationPlan {
    /// Fold the collected constraints into one layout.
    ///
    /// The row alignment is the max of the texture and SIMD requirements;
    /// the total size is the page-rounded max of the heap requirement and
    /// the rows the buffer must hold. Rounding the heap size up (rather
    /// than allocating the exact heap-reported size) keeps the allocation
    /// at least as large as every length later reported to a view.
    ///
    /// Fails with [`Error::InitializationFailed`] when the byte extent of
    /// the requested geometry does not fit in the address space; dimensions
    /// are well-typed `u32`s, so the overflow must surface as an error, not
    /// a wrap that would undersize the allocation behind the views.
    pub fn compute(
        request: &BufferRequest,
        layout: &FormatDescriptor,
        constraints: &LayoutConstraints,
    ) -> Result<Self> {
        let alignment = constraints
            .texture_row_alignment
            .max(constraints.simd_alignment);
        let overflow = || {
            Error::InitializationFailed(format!(
                "byte size of a {}x{} buffer overflows the address space",
                request.width, request.height
            ))
        };
        let stride = checked_row_stride(request.width as usize, layout.element_size, alignment)
            .ok_or_else(overflow)?;
        let rows_size = stride
            .checked_mul(request.height as usize)
            .ok_or_else(overflow)?;
        let total_size = checked_align_up(
            constraints.heap.size.max(rows_size),
            constraints.page_size,
        )
        .ok_or_else(overflow)?;

        debug_assert!(stride >= request.width as usize * layout.element_size);
        debug_assert_eq!(stride % alignment, 0);
        debug_assert_eq!(total_size % constraints.page_size, 0);
        debug_assert!(total_size >= constraints.heap.size);

        Ok(Self {
            width: request.width,
            height: request.height,
            row_stride: stride,
            total_size,
            alignment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::GpuPixelFormat;

    fn constraints(
        heap_size: usize,
        texture_row_alignment: usize,
        simd_alignment: usize,
    ) -> LayoutConstraints {
        LayoutConstraints {
            heap: SizeAlign {
                size: heap_size,
                align: 256,
            },
            texture_row_alignment,
            simd_alignment,
            page_size: 4096,
        }
    }

    #[test]
    fn test_row_alignment_takes_strictest_requirement() {
        let request = BufferRequest::new(100, 1, GpuPixelFormat::Rgba8Unorm);
        let layout = GpuPixelFormat::Rgba8Unorm.descriptor().unwrap();

        let plan = AllocationPlan::compute(&request, &layout, &constraints(400, 16, 64)).unwrap();
        assert_eq!(plan.row_stride, 448);
        assert_eq!(plan.alignment, 64);

        // Flipped: the texture side dominates.
        let plan = AllocationPlan::compute(&request, &layout, &constraints(400, 64, 16)).unwrap();
        assert_eq!(plan.row_stride, 448);
    }

    #[test]
    fn test_total_size_is_page_rounded_heap_size() {
        let request = BufferRequest::new(100, 1, GpuPixelFormat::Rgba8Unorm);
        let layout = GpuPixelFormat::Rgba8Unorm.descriptor().unwrap();

        let plan =
            AllocationPlan::compute(&request, &layout, &constraints(1_000_000, 16, 64)).unwrap();
        assert_eq!(plan.total_size, 1_003_520);
    }

    #[test]
    fn test_total_size_never_smaller_than_rows() {
        // Heap reports less than the padded rows need; the plan must still
        // hold every row.
        let request = BufferRequest::new(1000, 100, GpuPixelFormat::Rgba8Unorm);
        let layout = GpuPixelFormat::Rgba8Unorm.descriptor().unwrap();

        let plan = AllocationPlan::compute(&request, &layout, &constraints(4000, 16, 4096)).unwrap();
        assert!(plan.total_size >= plan.row_stride * 100);
        assert_eq!(plan.total_size % 4096, 0);
    }

    #[test]
    fn test_compute_rejects_overflowing_layout() {
        let request = BufferRequest::new(u32::MAX, u32::MAX, GpuPixelFormat::Rgba8Unorm);
        let layout = GpuPixelFormat::Rgba8Unorm.descriptor().unwrap();

        let err = AllocationPlan::compute(&request, &layout, &constraints(400, 16, 64)).unwrap_err();
        assert!(matches!(err, Error::InitializationFailed(_)));
    }

    /// Device double whose heap sizing demands more alignment than a page.
    struct SuperPageDevice;

    impl GpuDevice for SuperPageDevice {
        fn heap_texture_size_and_align(&self, _desc: &TextureDescriptor) -> Result<SizeAlign> {
            Ok(SizeAlign {
                size: 4096,
                align: 8192,
            })
        }

        fn linear_texture_alignment(&self, _format: GpuPixelFormat) -> Result<usize> {
            Ok(16)
        }

        fn buffer_no_copy(
            &self,
            allocation: crate::memory::PageAllocation,
        ) -> Result<crate::gpu::GpuBuffer> {
            crate::gpu::SoftwareDevice.buffer_no_copy(allocation)
        }

        fn texture_from_buffer(
            &self,
            buffer: &crate::gpu::GpuBuffer,
            desc: &TextureDescriptor,
            row_stride: usize,
        ) -> Result<crate::gpu::GpuTexture> {
            crate::gpu::SoftwareDevice.texture_from_buffer(buffer, desc, row_stride)
        }
    }

    #[test]
    fn test_collect_rejects_heap_alignment_beyond_page() {
        let simd = crate::simd::SoftwareSimd;
        let request = BufferRequest::new(100, 10, GpuPixelFormat::Rgba8Unorm);
        let layout = GpuPixelFormat::Rgba8Unorm.descriptor().unwrap();

        let err = LayoutConstraints::collect(
            &SuperPageDevice,
            &simd,
            4096,
            &request,
            &layout,
            StorageMode::Shared,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InitializationFailed(_)));
    }

    #[test]
    fn test_collect_rejects_zero_dimensions() {
        let device = crate::gpu::SoftwareDevice;
        let simd = crate::simd::SoftwareSimd;
        let request = BufferRequest::new(0, 10, GpuPixelFormat::R8Unorm);
        let layout = GpuPixelFormat::R8Unorm.descriptor().unwrap();

        let err = LayoutConstraints::collect(
            &device,
            &simd,
            4096,
            &request,
            &layout,
            StorageMode::Shared,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InitializationFailed(_)));
    }
}
