//! GPU and CPU pixel format descriptions.
//!
//! The format table is a static read-only lookup from a GPU pixel format to
//! the layout facts the planner needs: element size, bits per component, and
//! the CPU-side format the same bytes can be read back as. Formats without
//! all three (compressed blocks, packed depth/stencil) are unsupported and
//! rejected before any allocation work begins.

// ============================================================================
// GPU pixel formats
// ============================================================================

/// GPU texture pixel formats.
///
/// Linear formats carry a descriptor via [`GpuPixelFormat::descriptor`];
/// block-compressed and packed depth/stencil formats do not and cannot back
/// a shared buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GpuPixelFormat {
    /// 8-bit single channel, normalized.
    R8Unorm,
    /// 8-bit two channel, normalized.
    Rg8Unorm,
    /// 8-bit RGBA, normalized.
    Rgba8Unorm,
    /// 8-bit BGRA, normalized.
    Bgra8Unorm,
    /// 16-bit float single channel.
    R16Float,
    /// 16-bit float RGBA.
    Rgba16Float,
    /// 32-bit float single channel.
    R32Float,
    /// 32-bit float RGBA.
    Rgba32Float,
    /// 32-bit float depth.
    Depth32Float,
    /// BC1 block-compressed RGBA. No linear element size; unsupported.
    Bc1Rgba,
    /// Packed 24-bit depth with 8-bit stencil. No CPU equivalent; unsupported.
    Depth24Stencil8,
}

/// CPU-side pixel format tags.
///
/// These describe how the same bytes are interpreted by CPU pixel-buffer
/// consumers (bitmap contexts, software converters).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CpuPixelFormat {
    /// One 8-bit component per pixel.
    OneComponent8,
    /// Two 8-bit components per pixel.
    TwoComponent8,
    /// 32-bit RGBA, 8 bits per component.
    Rgba32,
    /// 32-bit BGRA, 8 bits per component.
    Bgra32,
    /// One 16-bit half-float component per pixel.
    OneComponent16Half,
    /// Four 16-bit half-float components per pixel.
    Rgba64Half,
    /// One 32-bit float component per pixel.
    OneComponent32Float,
    /// Four 32-bit float components per pixel.
    Rgba128Float,
}

/// Layout facts for a supported GPU pixel format.
///
/// Immutable; every supported format reports a nonzero element size and
/// nonzero bits per component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Bytes per pixel element.
    pub element_size: usize,
    /// Bits per color component.
    pub bits_per_component: u32,
    /// CPU-side interpretation of the same bytes.
    pub cpu_format: CpuPixelFormat,
}

impl FormatDescriptor {
    const fn new(element_size: usize, bits_per_component: u32, cpu_format: CpuPixelFormat) -> Self {
        Self {
            element_size,
            bits_per_component,
            cpu_format,
        }
    }
}

impl GpuPixelFormat {
    /// Look up the layout descriptor for this format.
    ///
    /// Returns `None` for formats that lack a linear element size, a bit
    /// depth, or a CPU-side equivalent. Callers must treat `None` as
    /// [`Error::UnsupportedPixelFormat`](crate::Error::UnsupportedPixelFormat)
    /// before acquiring any resource.
    pub const fn descriptor(self) -> Option<FormatDescriptor> {
        use CpuPixelFormat::*;
        match self {
            Self::R8Unorm => Some(FormatDescriptor::new(1, 8, OneComponent8)),
            Self::Rg8Unorm => Some(FormatDescriptor::new(2, 8, TwoComponent8)),
            Self::Rgba8Unorm => Some(FormatDescriptor::new(4, 8, Rgba32)),
            Self::Bgra8Unorm => Some(FormatDescriptor::new(4, 8, Bgra32)),
            Self::R16Float => Some(FormatDescriptor::new(2, 16, OneComponent16Half)),
            Self::Rgba16Float => Some(FormatDescriptor::new(8, 16, Rgba64Half)),
            Self::R32Float => Some(FormatDescriptor::new(4, 32, OneComponent32Float)),
            Self::Rgba32Float => Some(FormatDescriptor::new(16, 32, Rgba128Float)),
            Self::Depth32Float => Some(FormatDescriptor::new(4, 32, OneComponent32Float)),
            Self::Bc1Rgba | Self::Depth24Stencil8 => None,
        }
    }

    /// Whether this format can back a shared buffer.
    #[inline]
    pub const fn is_supported(self) -> bool {
        self.descriptor().is_some()
    }
}
