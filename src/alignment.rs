//! Alignment arithmetic.
//!
//! Pure functions shared by the layout planner. GPU heap alignments, linear
//! texture alignments, and SIMD alignments are arbitrary positive integers,
//! not necessarily powers of two, so rounding is division-based rather than
//! mask-based.

/// Round `size` up to the next multiple of `align`.
///
/// `align` must be greater than 0. Works for any positive alignment, not
/// just powers of two. Overflows on sizes within `align` of `usize::MAX`;
/// layout planning for untrusted dimensions goes through
/// [`checked_align_up`].
///
/// # Example
///
/// ```rust
/// use sharedframe::alignment::align_up;
///
/// assert_eq!(align_up(1_000_000, 4096), 1_003_520);
/// assert_eq!(align_up(4096, 4096), 4096);
/// ```
#[inline]
pub const fn align_up(size: usize, align: usize) -> usize {
    debug_assert!(align > 0);
    ((size + align - 1) / align) * align
}

/// Round `size` up to the next multiple of `align`, or `None` when the
/// result does not fit in `usize`.
#[inline]
pub const fn checked_align_up(size: usize, align: usize) -> Option<usize> {
    debug_assert!(align > 0);
    match size.checked_add(align - 1) {
        Some(padded) => Some((padded / align) * align),
        None => None,
    }
}

/// Compute the aligned byte distance between consecutive rows.
///
/// Returns the smallest multiple of `alignment` that holds `width` elements
/// of `element_size` bytes each.
///
/// # Example
///
/// ```rust
/// use sharedframe::alignment::row_stride;
///
/// // 100 pixels of 4 bytes each, rows padded to 64-byte boundaries.
/// assert_eq!(row_stride(100, 4, 64), 448);
/// ```
#[inline]
pub const fn row_stride(width: usize, element_size: usize, alignment: usize) -> usize {
    align_up(width * element_size, alignment)
}

/// Compute the aligned row stride, or `None` when `width * element_size` or
/// the aligned result does not fit in `usize`.
#[inline]
pub const fn checked_row_stride(
    width: usize,
    element_size: usize,
    alignment: usize,
) -> Option<usize> {
    match width.checked_mul(element_size) {
        Some(row_bytes) => checked_align_up(row_bytes, alignment),
        None => None,
    }
}
