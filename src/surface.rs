//! Surface data extraction.
//!
//! Collaborator interface for reading geometry out of an opaque, optionally
//! multiplanar platform image surface. Zero-copy: the functions here bracket
//! the surface with an acquire/release pair, read existing metadata, and
//! never allocate.

use crate::error::{Error, Result};

/// Opaque platform image surface, optionally multiplanar.
///
/// `lock`/`unlock` bracket metadata and base-address reads; geometry getters
/// return the raw platform values, signed so non-positive answers stay
/// representable and can be rejected here.
pub trait ImageSurface {
    /// Acquire the surface for metadata access.
    fn lock(&self) -> Result<()>;

    /// Release the surface.
    fn unlock(&self);

    /// Number of planes; 0 or 1 for a packed surface.
    fn plane_count(&self) -> usize;

    /// Width in pixels of the given plane.
    fn plane_width(&self, plane: usize) -> i64;

    /// Height in rows of the given plane.
    fn plane_height(&self, plane: usize) -> i64;

    /// Row stride in bytes of the given plane.
    fn plane_row_stride(&self, plane: usize) -> i64;

    /// Base address of the given plane, valid while locked.
    fn plane_base_address(&self, plane: usize) -> *mut u8;
}

/// Geometry and base address extracted from a surface plane.
#[derive(Clone, Copy, Debug)]
pub struct GraphicsData {
    /// Width in pixels.
    pub width: u32,
    /// Height in rows.
    pub height: u32,
    /// Base address of the first row.
    pub base_address: *mut u8,
    /// Bytes between consecutive rows.
    pub row_stride: usize,
}

/// Unlocks the surface when the extraction scope exits, on every path.
struct SurfaceGuard<'a>(&'a dyn ImageSurface);

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        self.0.unlock();
    }
}

/// Extract geometry from the surface's primary plane.
///
/// Reads plane 0 whether the surface reports itself as packed (plane count
/// 0) or planar. Fails with [`Error::MissingData`] when any geometry field
/// is non-positive.
pub fn graphics_data(surface: &dyn ImageSurface) -> Result<GraphicsData> {
    extract(surface, 0).map_err(|_| Error::MissingData)
}

/// Extract geometry from one plane of a multiplanar surface.
///
/// Fails with [`Error::MissingDataOfPlane`] when the index is outside the
/// surface's plane count or any geometry field of that plane is
/// non-positive.
pub fn plane_graphics_data(surface: &dyn ImageSurface, plane: usize) -> Result<GraphicsData> {
    if plane >= surface.plane_count() {
        return Err(Error::MissingDataOfPlane(plane));
    }
    extract(surface, plane).map_err(|_| Error::MissingDataOfPlane(plane))
}

fn extract(surface: &dyn ImageSurface, plane: usize) -> Result<GraphicsData> {
    surface.lock()?;
    let _guard = SurfaceGuard(surface);

    let width = surface.plane_width(plane);
    let height = surface.plane_height(plane);
    let row_stride = surface.plane_row_stride(plane);
    let base_address = surface.plane_base_address(plane);

    if width <= 0 || height <= 0 || row_stride <= 0 || base_address.is_null() {
        return Err(Error::MissingData);
    }

    Ok(GraphicsData {
        width: width as u32,
        height: height as u32,
        base_address,
        row_stride: row_stride as usize,
    })
}
