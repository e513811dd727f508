//! Error types for sharedframe.

use crate::format::GpuPixelFormat;
use thiserror::Error;

/// Result type alias using sharedframe's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sharedframe operations.
///
/// Construction errors split into two kinds: configuration errors
/// ([`Error::UnsupportedPixelFormat`]) are detected before any resource is
/// acquired, while resource errors ([`Error::InitializationFailed`]) occur
/// mid-construction and unwind every intermediate resource before
/// propagating. Neither kind is retried internally.
#[derive(Error, Debug)]
pub enum Error {
    /// The GPU pixel format has no element size, bit depth, or CPU-side
    /// equivalent. Detected up front, before any allocation work.
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedPixelFormat(GpuPixelFormat),

    /// An allocation, buffer-wrap, or texture-construction step failed.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// A surface reported non-positive geometry for its primary plane.
    #[error("surface has no usable graphics data")]
    MissingData,

    /// A surface reported non-positive geometry for the given plane.
    #[error("surface plane {0} has no usable graphics data")]
    MissingDataOfPlane(usize),
}
