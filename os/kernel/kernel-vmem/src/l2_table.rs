//! # `ARMv7-A` Second-Level Table (L2, coarse page table)
//!
//! - [`L2Index`]: index type for VA bits `[19:12]`.
//! - [`L2Entry`]: a raw small-page descriptor.
//! - [`L2Table`]: a 1 KiB-aligned array of 256 descriptors covering one 1 MiB
//!   section.
//!
//! ## Semantics
//!
//! - An entry of all zeros is a translation fault and is treated as empty.
//! - A populated entry maps one 4 KiB frame; the frame base is the entry
//!   masked with [`PTE_SMALL_PADDR_MASK`].
//! - Writes go through the kernel window, so callers clean the data cache over
//!   [`L2Table::byte_range`] before a hardware walker may read the table.

use crate::MmuFlags;
use crate::SmallPageBits;
use crate::addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use crate::info::{ENTRIES_PER_L2TABLE, L2TABLE_SIZE, PTE_SMALL_PADDR_MASK};
use core::fmt;
use core::ops::Range;
use core::ptr;

/// Index into an L2 table (derived from VA bits `[19:12]`).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct L2Index(u16);

impl L2Index {
    /// Extract bits `[19:12]` of `va`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u32() >> 12) & 0xFF) as u16)
    }

    /// ### Debug assertions
    /// - Asserts `v < 256` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < ENTRIES_PER_L2TABLE);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A single small-page descriptor.
#[doc(alias = "PTE")]
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct L2Entry(u32);

impl L2Entry {
    /// Create a zero (faulting) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Encode a small-page mapping of `page` with `flags`.
    #[inline]
    #[must_use]
    pub const fn small_page(page: PhysicalPage<Size4K>, flags: MmuFlags) -> Self {
        Self((page.base().as_u32() & PTE_SMALL_PADDR_MASK) | flags.raw())
    }

    /// `true` for any non-zero descriptor.
    #[inline]
    #[must_use]
    pub const fn is_populated(self) -> bool {
        self.0 != 0
    }

    /// The mapped frame, if the entry is populated.
    #[inline]
    #[must_use]
    pub const fn page(self) -> Option<PhysicalPage<Size4K>> {
        if self.is_populated() {
            Some(PhysicalPage::from_addr(PhysicalAddress::new(self.0 & PTE_SMALL_PADDR_MASK)))
        } else {
            None
        }
    }

    /// Attribute bits, i.e. everything outside the frame field.
    #[inline]
    #[must_use]
    pub const fn flags(self) -> MmuFlags {
        MmuFlags::from_raw(self.0)
    }

    /// Bitfield view for inspection.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> SmallPageBits {
        SmallPageBits::from_bits(self.0)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// No validation is performed.
    #[inline]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self(v)
    }
}

impl fmt::Debug for L2Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L2Entry({:#010X})", self.0)
    }
}

/// The L2 table: 256 entries, 1 KiB-aligned.
#[repr(C, align(1024))]
pub struct L2Table {
    entries: [L2Entry; ENTRIES_PER_L2TABLE],
}

const _: () = assert!(size_of::<L2Table>() == L2TABLE_SIZE);

impl L2Table {
    /// Create a fully zeroed table (all entries faulting).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [L2Entry::zero(); ENTRIES_PER_L2TABLE],
        }
    }

    /// Clear every entry in place.
    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(L2Entry::zero());
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: L2Index) -> L2Entry {
        self.entries[i.as_usize()]
    }

    /// Plain store; no cache or TLB maintenance.
    #[inline]
    pub const fn set(&mut self, i: L2Index, e: L2Entry) {
        self.entries[i.as_usize()] = e;
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = L2Entry> + '_ {
        self.entries.iter().copied()
    }

    /// Number of populated entries.
    #[inline]
    #[must_use]
    pub fn populated(&self) -> usize {
        self.iter().filter(|e| e.is_populated()).count()
    }

    /// Kernel virtual byte range occupied by this table.
    #[inline]
    #[must_use]
    pub fn byte_range(&self) -> Range<usize> {
        let start = ptr::from_ref(self).addr();
        start..start + L2TABLE_SIZE
    }
}
