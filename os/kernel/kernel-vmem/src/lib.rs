//! # Virtual Memory Support
//!
//! `ARMv7-A` short-descriptor paging helpers for process address environments.
//!
//! ## What you get
//! - A 1 KiB [`L2Table`] of 256 small-page descriptors ([`L2Entry`]), each
//!   table covering one 1 MiB section.
//! - A bitfield model of the small-page descriptor ([`SmallPageBits`]) and an
//!   opaque permission descriptor ([`MmuFlags`]) passed through to it.
//! - Collaborator interfaces: [`FrameAlloc`] (physical frames),
//!   [`PhysMapper`] (always-mapped kernel window), [`DataCache`] (cache
//!   maintenance for the table walker).
//! - The region builder/destroyer ([`region`], behind the `addrenv` feature).
//!
//! ## Two-level walk
//!
//! ```text
//! | 31‒20 | 19‒12 | 11‒0   |
//! |  L1   |  L2   | Offset |
//! ```
//!
//! ```text
//!  L1 directory (4096 entries)  →  L2 table (256 entries)  →  4 KiB frame
//!        │                               │
//!        │                               └──► small-page descriptor: frame | attributes
//!        └──────────────────────────────────► page-table descriptor: L2 table base
//! ```
//!
//! The L1 directory is owned by the address environment and is not touched
//! here. Regions are built as detached L2 tables whose physical addresses are
//! recorded in a caller-supplied slot array; linking them into the directory
//! happens later, elsewhere.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod cache;
pub mod l2_table;
mod mmu_flags;
#[cfg(feature = "addrenv")]
pub mod region;
mod small_page_bits;

#[cfg(target_arch = "arm")]
pub use crate::cache::ArmDataCache;
pub use crate::cache::{DataCache, NoCache};
pub use crate::l2_table::{L2Entry, L2Index, L2Table};
pub use crate::mmu_flags::MmuFlags;
pub use crate::small_page_bits::SmallPageBits;

pub use kernel_memory_addresses as addresses;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// Re-export constants as info module.
pub use kernel_info::memory as info;

/// Physical frame allocator handing out 4 KiB frames.
///
/// The implementation decides where frames come from (page pool bitmap,
/// bootloader pool, ...). Returned frames **must** be 4 KiB aligned and
/// **must not** be physical address zero: the region code treats a zero
/// address as an allocator bug.
///
/// Implementations are called with local interrupts masked and therefore must
/// not block or re-enable interrupts.
pub trait FrameAlloc {
    /// Allocate one 4 KiB *physical* frame. Returns `None` on out-of-memory.
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>>;

    /// Return a frame previously obtained from [`alloc_4k`](Self::alloc_4k).
    fn free_4k(&mut self, page: PhysicalPage<Size4K>);
}

impl<A: FrameAlloc + ?Sized> FrameAlloc for &mut A {
    #[inline]
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        (**self).alloc_4k()
    }

    #[inline]
    fn free_4k(&mut self, page: PhysicalPage<Size4K>) {
        (**self).free_4k(page);
    }
}

/// Converts physical addresses to *temporarily* usable pointers in the kernel
/// address space, e.g. through the always-mapped page-pool window.
///
/// Page tables under construction are not linked into any directory yet, so
/// this window is the only way to write them.
pub trait PhysMapper {
    /// Convert a *physical* address to a usable mutable reference.
    ///
    /// # Safety
    /// - `pa` must be covered by the window and mapped writable.
    /// - Lifetime `'a` is purely borrow-checked; the mapping must remain valid
    ///   for `'a`.
    /// - Type `T` must match the bytes at `pa`, and no other reference to the
    ///   same memory may be live (no aliasing UB).
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;

    /// Borrow the [`L2Table`] held in `page`.
    ///
    /// # Safety
    /// Same contract as [`phys_to_mut`](Self::phys_to_mut); `page` must hold an
    /// L2 table (any bit pattern is a valid [`L2Table`]).
    #[inline]
    unsafe fn l2_table_mut<'a>(&self, page: PhysicalPage<Size4K>) -> &'a mut L2Table {
        unsafe { self.phys_to_mut::<L2Table>(page.base()) }
    }

    /// Read-only view of the [`L2Table`] held in `page`.
    ///
    /// # Safety
    /// As for [`l2_table_mut`](Self::l2_table_mut), except that other shared
    /// views of the table may coexist with the returned one.
    #[inline]
    unsafe fn l2_table<'a>(&self, page: PhysicalPage<Size4K>) -> &'a L2Table {
        unsafe { self.l2_table_mut(page) }
    }
}
