//! # Memory Layout

/// Size of a small page (the unit of one L2 entry and one physical frame).
pub const PAGE_SIZE: u32 = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

/// Virtual span covered by one L2 table (one L1 section entry).
pub const SECTION_SIZE: u32 = 1024 * 1024;

/// `log2(SECTION_SIZE)`.
pub const SECTION_SHIFT: u32 = 20;

/// Number of small-page descriptors in one L2 table.
pub const ENTRIES_PER_L2TABLE: usize = (SECTION_SIZE / PAGE_SIZE) as usize;

/// Size of one L2 table in bytes (256 descriptors of 4 bytes each).
pub const L2TABLE_SIZE: usize = ENTRIES_PER_L2TABLE * size_of::<u32>();

/// Mask of the physical base in a small-page descriptor.
pub const PTE_SMALL_PADDR_MASK: u32 = 0xFFFF_F000;

/// Physical base of the page pool served by the page allocator.
pub const PGPOOL_PBASE: u32 = 0x6100_0000;

/// Kernel virtual address at which the page pool is permanently mapped.
///
/// Any pool frame at `pa` is reachable at `PGPOOL_VBASE + (pa - PGPOOL_PBASE)`,
/// which is how page tables are written before they are linked into a
/// directory.
pub const PGPOOL_VBASE: u32 = 0xE100_0000;

/// Size of the page pool in bytes.
pub const PGPOOL_SIZE: u32 = 16 * 1024 * 1024;

/// Number of frames in the page pool.
pub const PGPOOL_FRAMES: usize = (PGPOOL_SIZE / PAGE_SIZE) as usize;

/// Number of pages needed to hold `bytes` (rounded up).
///
/// Returns `None` if rounding up overflows.
#[inline]
#[must_use]
pub const fn pages_for(bytes: usize) -> Option<usize> {
    match bytes.checked_add(PAGE_SIZE as usize - 1) {
        Some(v) => Some(v >> PAGE_SHIFT),
        None => None,
    }
}

const _: () = {
    assert!(1 << PAGE_SHIFT == PAGE_SIZE);
    assert!(1 << SECTION_SHIFT == SECTION_SIZE);
    assert!(ENTRIES_PER_L2TABLE == 256);
    assert!(L2TABLE_SIZE == 1024);
    assert!(
        PGPOOL_PBASE != 0,
        "physical address zero is the empty sentinel"
    );
    assert!(PGPOOL_PBASE.is_multiple_of(PAGE_SIZE));
    assert!(PGPOOL_VBASE.is_multiple_of(PAGE_SIZE));
    assert!(PGPOOL_SIZE.is_multiple_of(PAGE_SIZE));
    assert!(PGPOOL_VBASE.checked_add(PGPOOL_SIZE).is_some());
};
