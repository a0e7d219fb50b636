use crate::{MemoryAddressOffset, MemoryPage, PageSize, PhysicalAddress};
use core::fmt;

/// Physical memory page base for size `S`.
///
/// A `PhysicalPage<S>` represents the **page-aligned base** of a physical page
/// of size `S` (`S::SIZE` bytes). It is a thin wrapper over [`MemoryPage<S>`]
/// with physical-address intent.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero (page aligned).
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x6012_3456);
/// let pp = pa.page::<Size4K>();
/// assert_eq!(pp.frame_number(), 0x60123);
/// assert_eq!(pp.join(pa.offset::<Size4K>()), pa);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize>(pub(crate) MemoryPage<S>);

impl<S: PageSize> PhysicalPage<S> {
    #[inline]
    #[must_use]
    pub const fn from_addr(p: PhysicalAddress) -> Self {
        Self(MemoryPage::from_addr(p.0))
    }

    /// Page from its frame number (`base >> S::SHIFT`).
    #[inline]
    #[must_use]
    pub const fn from_frame_number(n: u32) -> Self {
        Self(MemoryPage::from_number(n))
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress(self.0.base())
    }

    #[inline]
    #[must_use]
    pub const fn frame_number(self) -> u32 {
        self.0.number()
    }

    /// `true` for the page at physical address zero.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0.base().as_u32() == 0
    }

    #[inline]
    #[must_use]
    pub const fn join(self, off: MemoryAddressOffset<S>) -> PhysicalAddress {
        PhysicalAddress(self.0.join(off))
    }
}

impl<S: PageSize> fmt::Display for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PhysicalPage<{}>({:#010X})",
            S::as_str(),
            self.0.base().as_u32()
        )
    }
}

impl<S: PageSize> From<MemoryPage<S>> for PhysicalPage<S> {
    #[inline]
    fn from(p: MemoryPage<S>) -> Self {
        Self(p)
    }
}
