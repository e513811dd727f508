//! Construction, failure-unwinding, and teardown tests for
//! `SharedGraphicsBuffer`, using counting test doubles for the allocator and
//! fail-at-step doubles for the GPU device.

use sharedframe::buffer::SharedGraphicsBuffer;
use sharedframe::format::GpuPixelFormat;
use sharedframe::gpu::{
    GpuBuffer, GpuDevice, GpuTexture, SizeAlign, SoftwareDevice, TextureDescriptor,
};
use sharedframe::memory::{PageAllocation, PageAllocator};
use sharedframe::plan::BufferRequest;
use sharedframe::simd::{SimdImaging, SoftwareSimd};
use sharedframe::{Error, Result};

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Allocator double that counts allocations and live regions.
#[derive(Default)]
struct CountingAllocator {
    /// Total allocate() calls that handed out a region.
    allocated: AtomicUsize,
    /// Regions handed out and not yet released.
    live: Arc<AtomicUsize>,
    /// Deallocator invocations, for the exactly-once check.
    released: Arc<AtomicUsize>,
    /// Make the next allocate() fail.
    fail: bool,
}

impl CountingAllocator {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

impl PageAllocator for CountingAllocator {
    fn page_size(&self) -> usize {
        4096
    }

    fn allocate(&self, size: usize) -> Result<PageAllocation> {
        if self.fail {
            return Err(Error::InitializationFailed("simulated allocation failure".into()));
        }

        let bytes = vec![0u8; size].into_boxed_slice();
        let raw = Box::into_raw(bytes);
        let ptr = NonNull::new(raw.cast::<u8>()).expect("boxed slice is non-null");

        self.allocated.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);

        let live = Arc::clone(&self.live);
        let released = Arc::clone(&self.released);
        // SAFETY: ptr/size describe the leaked boxed slice; the deallocator
        // reconstructs and drops it exactly once.
        Ok(unsafe {
            PageAllocation::from_raw_parts(
                ptr,
                size,
                Box::new(move |ptr, len| {
                    live.fetch_sub(1, Ordering::SeqCst);
                    released.fetch_add(1, Ordering::SeqCst);
                    let slice = std::ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len);
                    drop(unsafe { Box::from_raw(slice) });
                }),
            )
        })
    }
}

/// Which construction step the device double rejects.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FailAt {
    Nothing,
    HeapQuery,
    BufferWrap,
    Texture,
}

/// Device double delegating to `SoftwareDevice` until the failing step.
struct FlakyDevice {
    inner: SoftwareDevice,
    fail_at: FailAt,
}

impl FlakyDevice {
    fn new(fail_at: FailAt) -> Self {
        Self {
            inner: SoftwareDevice,
            fail_at,
        }
    }
}

impl GpuDevice for FlakyDevice {
    fn heap_texture_size_and_align(&self, desc: &TextureDescriptor) -> Result<SizeAlign> {
        if self.fail_at == FailAt::HeapQuery {
            return Err(Error::InitializationFailed("simulated heap query failure".into()));
        }
        self.inner.heap_texture_size_and_align(desc)
    }

    fn linear_texture_alignment(&self, format: GpuPixelFormat) -> Result<usize> {
        self.inner.linear_texture_alignment(format)
    }

    fn buffer_no_copy(&self, allocation: PageAllocation) -> Result<GpuBuffer> {
        if self.fail_at == FailAt::BufferWrap {
            // Dropping the allocation here releases it, per the contract.
            drop(allocation);
            return Err(Error::InitializationFailed("simulated buffer-wrap failure".into()));
        }
        self.inner.buffer_no_copy(allocation)
    }

    fn texture_from_buffer(
        &self,
        buffer: &GpuBuffer,
        desc: &TextureDescriptor,
        row_stride: usize,
    ) -> Result<GpuTexture> {
        if self.fail_at == FailAt::Texture {
            return Err(Error::InitializationFailed("simulated texture failure".into()));
        }
        self.inner.texture_from_buffer(buffer, desc, row_stride)
    }
}

/// SIMD double with a configurable or failing alignment answer.
struct FixedSimd {
    alignment: Option<usize>,
}

impl SimdImaging for FixedSimd {
    fn required_alignment(&self, _w: u32, _h: u32, _bits: u32) -> Result<usize> {
        self.alignment
            .ok_or_else(|| Error::InitializationFailed("simulated alignment query failure".into()))
    }
}

fn request() -> BufferRequest {
    BufferRequest::new(100, 60, GpuPixelFormat::Rgba8Unorm)
}

#[test]
fn unsupported_format_fails_before_any_allocation() {
    let allocator = CountingAllocator::default();
    let result = SharedGraphicsBuffer::new(
        &SoftwareDevice,
        &SoftwareSimd,
        &allocator,
        &BufferRequest::new(64, 64, GpuPixelFormat::Bc1Rgba),
    );

    assert!(matches!(result, Err(Error::UnsupportedPixelFormat(_))));
    assert_eq!(allocator.allocated.load(Ordering::SeqCst), 0);
}

#[test]
fn failed_query_performs_no_allocation() {
    let allocator = CountingAllocator::default();
    let device = FlakyDevice::new(FailAt::HeapQuery);
    let result = SharedGraphicsBuffer::new(&device, &SoftwareSimd, &allocator, &request());

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert_eq!(allocator.allocated.load(Ordering::SeqCst), 0);

    let simd = FixedSimd { alignment: None };
    let result = SharedGraphicsBuffer::new(&SoftwareDevice, &simd, &allocator, &request());

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert_eq!(allocator.allocated.load(Ordering::SeqCst), 0);
}

#[test]
fn oversized_dimensions_fail_without_allocating() {
    // Well-typed dimensions whose byte extent overflows the address space
    // must surface as an error, never as a wrapped size that would let an
    // undersized allocation pass validation.
    let allocator = CountingAllocator::default();
    let result = SharedGraphicsBuffer::new(
        &SoftwareDevice,
        &SoftwareSimd,
        &allocator,
        &BufferRequest::new(u32::MAX, u32::MAX, GpuPixelFormat::Rgba8Unorm),
    );

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert_eq!(allocator.allocated.load(Ordering::SeqCst), 0);
    assert_eq!(allocator.live.load(Ordering::SeqCst), 0);
}

#[test]
fn allocation_failure_leaks_nothing() {
    let allocator = CountingAllocator::failing();
    let result = SharedGraphicsBuffer::new(&SoftwareDevice, &SoftwareSimd, &allocator, &request());

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert_eq!(allocator.live.load(Ordering::SeqCst), 0);
}

#[test]
fn buffer_wrap_failure_releases_the_allocation() {
    let allocator = CountingAllocator::default();
    let device = FlakyDevice::new(FailAt::BufferWrap);
    let result = SharedGraphicsBuffer::new(&device, &SoftwareSimd, &allocator, &request());

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert_eq!(allocator.allocated.load(Ordering::SeqCst), 1);
    assert_eq!(allocator.live.load(Ordering::SeqCst), 0);
}

#[test]
fn texture_failure_releases_the_wrapped_buffer() {
    let allocator = CountingAllocator::default();
    let device = FlakyDevice::new(FailAt::Texture);
    let result = SharedGraphicsBuffer::new(&device, &SoftwareSimd, &allocator, &request());

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert_eq!(allocator.allocated.load(Ordering::SeqCst), 1);
    assert_eq!(allocator.live.load(Ordering::SeqCst), 0);
}

#[test]
fn handle_drop_releases_exactly_once() {
    let allocator = CountingAllocator::default();
    let shared =
        SharedGraphicsBuffer::new(&FlakyDevice::new(FailAt::Nothing), &SoftwareSimd, &allocator, &request())
            .unwrap();

    assert_eq!(allocator.live.load(Ordering::SeqCst), 1);
    assert_eq!(allocator.released.load(Ordering::SeqCst), 0);

    drop(shared);

    // Three views aliased the region; it is released exactly once.
    assert_eq!(allocator.live.load(Ordering::SeqCst), 0);
    assert_eq!(allocator.released.load(Ordering::SeqCst), 1);
}

#[test]
fn all_views_report_identical_layout() {
    let allocator = CountingAllocator::default();
    let simd = FixedSimd { alignment: Some(64) };
    let shared = SharedGraphicsBuffer::new(&SoftwareDevice, &simd, &allocator, &request()).unwrap();

    // max(texture alignment 16, simd alignment 64) over 100 * 4 bytes.
    assert_eq!(shared.row_stride(), 448);

    assert_eq!(shared.texture().width(), shared.pixels().width());
    assert_eq!(shared.pixels().width(), shared.simd().width());
    assert_eq!(shared.texture().height(), shared.pixels().height());
    assert_eq!(shared.pixels().height(), shared.simd().height());
    assert_eq!(shared.texture().row_stride(), shared.row_stride());
    assert_eq!(shared.pixels().row_stride(), shared.row_stride());
    assert_eq!(shared.simd().row_bytes(), shared.row_stride());

    let base = shared.base_address();
    assert_eq!(shared.texture().base_address(), base);
    assert_eq!(shared.simd().base_address(), base);
    assert_eq!(shared.pixels().lock().base_address(), base);
}

#[test]
fn total_size_is_page_rounded_and_covers_rows() {
    let allocator = CountingAllocator::default();
    let shared =
        SharedGraphicsBuffer::new(&SoftwareDevice, &SoftwareSimd, &allocator, &request()).unwrap();

    let total = shared.gpu_buffer().len();
    assert_eq!(total % allocator.page_size(), 0);
    assert!(total >= shared.row_stride() * shared.height() as usize);
}
