//! Vectorized-image-processing view.
//!
//! A [`SimdBuffer`] is the lightweight descriptor a SIMD image library
//! consumes: base address, pixel counts, and row bytes. The library's
//! alignment requirement is obtained through [`SimdImaging`], whose single
//! method mirrors invoking the library's buffer initializer in query-only
//! mode: it reports the alignment it would want and allocates nothing.

use crate::error::Result;
use std::ptr::NonNull;

/// Alignment query seam for the SIMD image library.
pub trait SimdImaging: Send + Sync {
    /// Minimum data alignment for a buffer of this geometry and bit depth.
    ///
    /// Query only: implementations must not allocate. Failures map to
    /// [`Error::InitializationFailed`](crate::Error::InitializationFailed).
    fn required_alignment(&self, width: u32, height: u32, bits_per_component: u32)
        -> Result<usize>;
}

/// Software SIMD alignment policy.
///
/// Answers the widest requirement in common use: one cache line, which also
/// covers 512-bit vector loads.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareSimd;

/// Cache-line / 512-bit vector alignment.
const VECTOR_ALIGNMENT: usize = 64;

impl SimdImaging for SoftwareSimd {
    fn required_alignment(
        &self,
        _width: u32,
        _height: u32,
        _bits_per_component: u32,
    ) -> Result<usize> {
        Ok(VECTOR_ALIGNMENT)
    }
}

/// SIMD buffer descriptor over shared bytes.
///
/// Non-owning: valid only while the owning GPU buffer of the same allocation
/// is alive. Field meanings follow the usual vector-imaging convention
/// (height in rows, width in pixels, row bytes between row starts).
#[derive(Debug)]
pub struct SimdBuffer {
    base: NonNull<u8>,
    width: u32,
    height: u32,
    row_bytes: usize,
}

impl SimdBuffer {
    pub(crate) fn new(base: NonNull<u8>, width: u32, height: u32, row_bytes: usize) -> Self {
        Self {
            base,
            width,
            height,
            row_bytes,
        }
    }

    /// Base address of the first row.
    #[inline]
    pub fn base_address(&self) -> *mut u8 {
        self.base.as_ptr()
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

    /// Bytes between consecutive row starts.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }
}

// SAFETY: Pointer-plus-geometry view; the pointee is owned by the GPU
// buffer aliasing the same allocation, and byte access requires external
// synchronization.
unsafe impl Send for SimdBuffer {}
unsafe impl Sync for SimdBuffer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_software_alignment_is_positive_and_constant() {
        let simd = SoftwareSimd;
        let a = simd.required_alignment(100, 100, 8).unwrap();
        let b = simd.required_alignment(1920, 1080, 32).unwrap();
        assert!(a > 0);
        assert_eq!(a, b);
    }
}
