//! GPU device trait and the software implementation.

use super::{GpuBuffer, GpuTexture, SizeAlign, TextureDescriptor};
use crate::alignment::{checked_align_up, checked_row_stride};
use crate::error::{Error, Result};
use crate::format::GpuPixelFormat;
use crate::memory::PageAllocation;

/// Error for texture byte extents that do not fit in the address space.
fn size_overflow(width: u32, height: u32) -> Error {
    Error::InitializationFailed(format!(
        "byte size of a {width}x{height} texture overflows the address space"
    ))
}

/// Backend seam for GPU layout queries and no-copy view construction.
///
/// The two query methods are pure: they allocate nothing and have no side
/// effects, so the planner may call them before committing to an allocation.
pub trait GpuDevice: Send + Sync {
    /// Minimum size and alignment to place a texture of this description in
    /// a memory heap. Query only.
    fn heap_texture_size_and_align(&self, desc: &TextureDescriptor) -> Result<SizeAlign>;

    /// Minimum row alignment required to construct a texture of this format
    /// from a raw buffer. Query only.
    fn linear_texture_alignment(&self, format: GpuPixelFormat) -> Result<usize>;

    /// Wrap a raw allocation as a GPU buffer without copying.
    ///
    /// On success the buffer takes over as the allocation's sole owner. On
    /// failure the implementation drops the allocation, which releases it;
    /// callers never see a half-owned region.
    fn buffer_no_copy(&self, allocation: PageAllocation) -> Result<GpuBuffer>;

    /// Construct a texture view over `buffer` at an explicit `row_stride`.
    ///
    /// Fails with [`Error::InitializationFailed`] when the stride is not a
    /// multiple of the format's linear alignment, the stride cannot hold a
    /// row, or the buffer cannot hold `height` rows.
    fn texture_from_buffer(
        &self,
        buffer: &GpuBuffer,
        desc: &TextureDescriptor,
        row_stride: usize,
    ) -> Result<GpuTexture>;
}

/// Heap placement granularity used by the software device.
const HEAP_GRANULARITY: usize = 256;

/// Software GPU device.
///
/// Applies the same layout rules a hardware backend enforces: linear
/// textures need rows aligned to the format's element size (at least 16
/// bytes), and heap placement rounds to a fixed granularity. Useful both as
/// the default backend and as the reference for what hardware backends must
/// validate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareDevice;

impl SoftwareDevice {
    fn descriptor_of(&self, format: GpuPixelFormat) -> Result<crate::format::FormatDescriptor> {
        format
            .descriptor()
            .ok_or(Error::UnsupportedPixelFormat(format))
    }
}

impl GpuDevice for SoftwareDevice {
    fn heap_texture_size_and_align(&self, desc: &TextureDescriptor) -> Result<SizeAlign> {
        let layout = self.descriptor_of(desc.format)?;
        let row_alignment = self.linear_texture_alignment(desc.format)?;
        let size = checked_row_stride(desc.width as usize, layout.element_size, row_alignment)
            .and_then(|stride| stride.checked_mul(desc.height as usize))
            .and_then(|bytes| checked_align_up(bytes, HEAP_GRANULARITY))
            .ok_or_else(|| size_overflow(desc.width, desc.height))?;
        Ok(SizeAlign {
            size,
            align: HEAP_GRANULARITY,
        })
    }

    fn linear_texture_alignment(&self, format: GpuPixelFormat) -> Result<usize> {
        let layout = self.descriptor_of(format)?;
        // Rows must start on an element boundary and no tighter than 16
        // bytes, matching common linear-texture hardware minimums.
        Ok(layout.element_size.max(16))
    }

    fn buffer_no_copy(&self, allocation: PageAllocation) -> Result<GpuBuffer> {
        if allocation.is_empty() {
            // Dropping the allocation releases it before the error escapes.
            return Err(Error::InitializationFailed(
                "cannot wrap an empty allocation".into(),
            ));
        }
        Ok(GpuBuffer::new(allocation))
    }

    fn texture_from_buffer(
        &self,
        buffer: &GpuBuffer,
        desc: &TextureDescriptor,
        row_stride: usize,
    ) -> Result<GpuTexture> {
        let layout = self.descriptor_of(desc.format)?;
        let row_alignment = self.linear_texture_alignment(desc.format)?;

        if row_stride % row_alignment != 0 {
            return Err(Error::InitializationFailed(format!(
                "row stride {row_stride} is not a multiple of the required alignment {row_alignment}"
            )));
        }
        let row_bytes = (desc.width as usize)
            .checked_mul(layout.element_size)
            .ok_or_else(|| size_overflow(desc.width, desc.height))?;
        if row_stride < row_bytes {
            return Err(Error::InitializationFailed(format!(
                "row stride {row_stride} cannot hold a {row_bytes}-byte row"
            )));
        }
        let needed = row_stride
            .checked_mul(desc.height as usize)
            .ok_or_else(|| size_overflow(desc.width, desc.height))?;
        if buffer.len() < needed {
            return Err(Error::InitializationFailed(format!(
                "buffer of {} bytes cannot hold {needed} bytes of texture data",
                buffer.len()
            )));
        }

        Ok(GpuTexture::new(
            buffer.contents(),
            desc.width,
            desc.height,
            row_stride,
            desc.format,
        ))
    }
}
