//! # Page-pool window [`PhysMapper`]
//!
//! The page pool is mapped once, at boot, at a fixed kernel virtual address.
//! A pool frame at `pa` is then reachable at `vbase + (pa - pbase)`, which is
//! how page tables are filled in before any directory refers to them.
//!
//! ## Example
//! ```rust,no_run
//! use kernel_alloc::phys_mapper::PgPoolMapper;
//! use kernel_vmem::addresses::{PhysicalAddress, PhysicalPage};
//! use kernel_vmem::PhysMapper;
//!
//! let mapper = PgPoolMapper::new();
//! let page = PhysicalPage::from_addr(PhysicalAddress::new(0x6100_4000));
//! unsafe {
//!     mapper.l2_table_mut(page).zero();
//! }
//! ```

use core::ptr;
use kernel_info::memory::{PGPOOL_PBASE, PGPOOL_VBASE};
use kernel_vmem::PhysMapper;
use kernel_vmem::addresses::PhysicalAddress;

/// [`PhysMapper`] over a linear window onto the page pool.
///
/// # Safety
/// - The window must be mapped and cover every address passed in.
/// - Addresses below the window's physical base are a caller bug.
#[derive(Copy, Clone, Debug)]
pub struct PgPoolMapper {
    pbase: u32,
    vbase: usize,
}

impl PgPoolMapper {
    /// The kernel's own window, `PGPOOL_PBASE` mapped at `PGPOOL_VBASE`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pbase: PGPOOL_PBASE,
            vbase: PGPOOL_VBASE as usize,
        }
    }

    /// A window with physical base `pbase` mapped at kernel address `vbase`.
    #[must_use]
    pub const fn with_window(pbase: PhysicalAddress, vbase: usize) -> Self {
        Self {
            pbase: pbase.as_u32(),
            vbase,
        }
    }

    /// Kernel virtual address of `pa`.
    #[inline]
    #[must_use]
    pub const fn virt(&self, pa: PhysicalAddress) -> usize {
        debug_assert!(pa.as_u32() >= self.pbase, "address below the page pool");
        self.vbase + (pa.as_u32().wrapping_sub(self.pbase) as usize)
    }
}

impl Default for PgPoolMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysMapper for PgPoolMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let va = ptr::with_exposed_provenance_mut::<T>(self.virt(pa));
        // SAFETY: Caller must ensure the address lies in the mapped window.
        unsafe { &mut *va }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_offsets_from_pool_base() {
        let m = PgPoolMapper::new();
        assert_eq!(
            m.virt(PhysicalAddress::new(PGPOOL_PBASE)),
            PGPOOL_VBASE as usize
        );
        assert_eq!(
            m.virt(PhysicalAddress::new(PGPOOL_PBASE + 0x5000)),
            PGPOOL_VBASE as usize + 0x5000
        );
    }

    #[test]
    fn custom_window_reaches_host_memory() {
        #[repr(C, align(4096))]
        struct Frames([u32; 2048]);

        let mut backing = Box::new(Frames([0; 2048]));
        let vbase = ptr::from_mut(&mut *backing).expose_provenance();
        let m = PgPoolMapper::with_window(PhysicalAddress::new(0x7000_0000), vbase);

        unsafe {
            *m.phys_to_mut::<u32>(PhysicalAddress::new(0x7000_1004)) = 0xC0FF_EE00;
        }
        assert_eq!(backing.0[1025], 0xC0FF_EE00);
    }
}
