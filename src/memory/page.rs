//! Page-aligned raw allocation and the allocator seam.

use crate::error::{Error, Result};
use rustix::mm::{MapFlags, ProtFlags};
use std::ptr::NonNull;

/// Deallocator callback attached to a [`PageAllocation`].
pub type Deallocator = Box<dyn FnOnce(NonNull<u8>, usize) + Send>;

/// A single raw memory region at a page-aligned address.
///
/// The region owns no view and carries no layout: every consumer is told the
/// same row stride and dimensions explicitly, so three independent layout
/// computations cannot silently diverge. The deallocator runs exactly once,
/// when the allocation is dropped.
///
/// # Safety
///
/// The region is plain bytes with no internal synchronization. Concurrent
/// mutation by producers and consumers is the caller's responsibility.
pub struct PageAllocation {
    ptr: NonNull<u8>,
    len: usize,
    dealloc: Option<Deallocator>,
}

impl PageAllocation {
    /// Assemble an allocation from a raw region and its deallocator.
    ///
    /// Used by [`PageAllocator`] implementations, including counting test
    /// doubles.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` readable and writable bytes that stay valid
    /// until `dealloc` is invoked, and `dealloc` must be the one true release
    /// path for the region.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, len: usize, dealloc: Deallocator) -> Self {
        Self {
            ptr,
            len,
            dealloc: Some(dealloc),
        }
    }

    /// Base address of the region.
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Base address as a non-null pointer.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Size of the region in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the region has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the region as a byte slice.
    ///
    /// # Safety
    ///
    /// The caller must ensure no mutable references to the region exist.
    pub unsafe fn as_slice(&self) -> &[u8] {
        // SAFETY: Caller guarantees no mutable references exist.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for PageAllocation {
    fn drop(&mut self) {
        if let Some(dealloc) = self.dealloc.take() {
            dealloc(self.ptr, self.len);
        }
    }
}

// SAFETY: The region is owned, reachable from exactly one PageAllocation,
// and the deallocator is required to be Send. Concurrent byte access needs
// external synchronization, same as any shared memory.
unsafe impl Send for PageAllocation {}
unsafe impl Sync for PageAllocation {}

impl std::fmt::Debug for PageAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageAllocation")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Allocator seam for page-aligned regions.
///
/// The production implementation is [`SystemPageAllocator`]; tests inject
/// counting and failing doubles through the same trait.
pub trait PageAllocator: Send + Sync {
    /// Host virtual-memory page size in bytes.
    fn page_size(&self) -> usize;

    /// Allocate `size` bytes starting at a page-aligned address.
    ///
    /// `size` must be greater than 0. Fails with
    /// [`Error::InitializationFailed`] when the platform allocator rejects
    /// the request.
    fn allocate(&self, size: usize) -> Result<PageAllocation>;
}

/// Page allocator backed by anonymous `mmap`.
///
/// `mmap` returns page-aligned addresses by construction, which satisfies
/// both GPU DMA and CPU SIMD access.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPageAllocator;

impl PageAllocator for SystemPageAllocator {
    #[inline]
    fn page_size(&self) -> usize {
        rustix::param::page_size()
    }

    fn allocate(&self, size: usize) -> Result<PageAllocation> {
        if size == 0 {
            return Err(Error::InitializationFailed(
                "allocation size must be greater than 0".into(),
            ));
        }

        // SAFETY: Anonymous mapping with a null hint; the kernel picks the
        // address.
        let ptr = unsafe {
            rustix::mm::mmap_anonymous(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::PRIVATE,
            )
        }
        .map_err(|errno| Error::InitializationFailed(format!("mmap of {size} bytes: {errno}")))?;

        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| Error::InitializationFailed("mmap returned null".into()))?;

        // SAFETY: ptr/size describe the mapping just created; munmap is its
        // release path.
        Ok(unsafe {
            PageAllocation::from_raw_parts(
                ptr,
                size,
                Box::new(|ptr, len| {
                    // SAFETY: Exact region returned by mmap above.
                    let _ = unsafe { rustix::mm::munmap(ptr.as_ptr().cast(), len) };
                }),
            )
        })
    }
}
