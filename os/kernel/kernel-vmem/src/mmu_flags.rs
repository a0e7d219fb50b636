use crate::SmallPageBits;
use crate::info::PTE_SMALL_PADDR_MASK;
use core::fmt;
use kernel_info::addrenv::Segment;

/// Attribute half of a small-page descriptor.
///
/// The region builder does not interpret these bits; it ORs them with the
/// frame address. Bits inside [`PTE_SMALL_PADDR_MASK`] are dropped on
/// construction so a flag value can never corrupt the frame field.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct MmuFlags(u32);

impl MmuFlags {
    #[inline]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self(v & !PTE_SMALL_PADDR_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn from_bits(bits: SmallPageBits) -> Self {
        Self::from_raw(bits.into_bits())
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> SmallPageBits {
        SmallPageBits::from_bits(self.0)
    }

    /// Normal memory, outer and inner write-back write-allocate.
    const fn write_back() -> SmallPageBits {
        SmallPageBits::new()
            .with_small(true)
            .with_tex(0b001)
            .with_cacheable(true)
            .with_bufferable(true)
    }

    /// Program text: user read-only, executable, process private.
    #[must_use]
    pub const fn user_text() -> Self {
        Self::from_bits(Self::write_back().with_access(0b10).with_not_global(true))
    }

    /// Program data, heap and stack: user read/write, never executable.
    #[must_use]
    pub const fn user_data() -> Self {
        Self::from_bits(
            Self::write_back()
                .with_access(0b11)
                .with_execute_never(true)
                .with_not_global(true),
        )
    }

    /// Shared memory: as [`user_data`](Self::user_data) plus shareable.
    #[must_use]
    pub const fn user_shm() -> Self {
        Self::from_bits(Self::user_data().bits().with_shareable(true))
    }

    #[must_use]
    pub const fn for_segment(segment: Segment) -> Self {
        match segment {
            Segment::Text => Self::user_text(),
            Segment::Data | Segment::Heap | Segment::Stack => Self::user_data(),
            Segment::Shm => Self::user_shm(),
        }
    }
}

impl fmt::Debug for MmuFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MmuFlags({:#05X})", self.0)
    }
}

impl From<SmallPageBits> for MmuFlags {
    #[inline]
    fn from(bits: SmallPageBits) -> Self {
        Self::from_bits(bits)
    }
}
