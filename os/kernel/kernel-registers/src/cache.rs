//! # Data Cache Maintenance
//!
//! Clean-by-MVA operations used to push page-table writes out to the point of
//! coherency, where the hardware table walker reads them.

use core::iter::StepBy;
use core::ops::Range;

/// The cache line base addresses covering `range` for a line of `line` bytes.
///
/// The start is aligned down to the line; an empty range yields nothing.
/// `line` must be a non-zero power of two.
#[inline]
#[must_use]
pub fn line_addresses(range: Range<usize>, line: usize) -> StepBy<Range<usize>> {
    debug_assert!(line.is_power_of_two());
    let start = range.start & !(line - 1);
    let end = if range.is_empty() { start } else { range.end };
    (start..end).step_by(line)
}

/// Cleans every data cache line overlapping `range` to the point of coherency
/// (`DCCMVAC`), then issues `DSB` so the writes are visible before returning.
///
/// # Safety
/// - Must run in a privileged mode.
/// - `range` must be mapped in the current translation regime.
#[cfg(all(feature = "asm", target_arch = "arm"))]
pub unsafe fn clean_dcache_range(range: Range<usize>) {
    use crate::LoadRegister;
    let line = crate::ctr::Ctr::load().dcache_line_size();
    for mva in line_addresses(range, line) {
        unsafe {
            core::arch::asm!("mcr p15, 0, {}, c7, c10, 1", in(reg) mva, options(nostack, preserves_flags));
        }
    }
    unsafe { dsb() }
}

/// Data Synchronization Barrier.
///
/// # Safety
/// Always safe to execute; `unsafe` only because it is raw inline assembly.
#[cfg(all(feature = "asm", target_arch = "arm"))]
#[inline]
pub unsafe fn dsb() {
    unsafe { core::arch::asm!("dsb sy", options(nostack, preserves_flags)) }
}
