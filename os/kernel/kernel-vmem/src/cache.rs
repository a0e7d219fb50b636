//! Data cache maintenance for freshly written page tables.

use core::ops::Range;

/// Makes CPU writes to a kernel virtual byte range visible to the hardware
/// table walker.
pub trait DataCache {
    /// Clean `range` to the point of coherency.
    fn flush_dcache(&self, range: Range<usize>);
}

impl<D: DataCache + ?Sized> DataCache for &D {
    #[inline]
    fn flush_dcache(&self, range: Range<usize>) {
        (**self).flush_dcache(range);
    }
}

/// For coherent walkers and hosted builds.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoCache;

impl DataCache for NoCache {
    #[inline]
    fn flush_dcache(&self, _range: Range<usize>) {}
}

/// `DCCMVAC` over the minimum D-cache line size, then `DSB`.
///
/// Must only be used in a privileged mode with `range` mapped.
#[cfg(target_arch = "arm")]
#[derive(Copy, Clone, Debug, Default)]
pub struct ArmDataCache;

#[cfg(target_arch = "arm")]
impl DataCache for ArmDataCache {
    #[inline]
    fn flush_dcache(&self, range: Range<usize>) {
        // SAFETY: the kernel runs privileged and callers only pass window ranges.
        unsafe { kernel_registers::cache::clean_dcache_range(range) }
    }
}
