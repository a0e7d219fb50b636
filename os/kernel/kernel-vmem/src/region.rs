//! # Address-Environment Regions
//!
//! A region is a contiguous virtual range of one process segment, backed by up
//! to `slots.len()` detached L2 tables. The caller owns the slot array; each
//! slot records the physical frame of one table (see [`RegionSlot`]).
//!
//! - [`RegionManager::create_region`] allocates the tables and one data frame
//!   per page, and encodes the descriptors.
//! - [`RegionManager::destroy_region`] releases the tables and, unless the
//!   backing pages are owned elsewhere (`keep`), the data frames.
//!
//! Building stops at the first allocation failure without undoing anything.
//! Whatever was built is recorded in the slots, so a later
//! [`destroy_region`](RegionManager::destroy_region) on the same slot array
//! reclaims it.
//!
//! ```text
//!  slots[0] ──► L2 table ─┬─► frame (vaddr + 0 KiB)
//!                         ├─► frame (vaddr + 4 KiB)
//!                         └─► … 256 entries / 1 MiB
//!  slots[1] ──► L2 table ───► … next 1 MiB
//!  slots[2]     Empty
//! ```

use crate::addresses::{PhysicalAddress, PhysicalPage, Size1M, Size4K, VirtualAddress};
use crate::info::{ENTRIES_PER_L2TABLE, PAGE_SHIFT, PAGE_SIZE, SECTION_SIZE, pages_for};
use crate::{DataCache, FrameAlloc, L2Entry, L2Index, MmuFlags, PhysMapper};
use kernel_info::addrenv::Segment;
use kernel_sync::{CriticalSection, InterruptControl};
use log::{debug, error, trace, warn};

/// One entry of a region's table list.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RegionSlot {
    /// No table allocated.
    #[default]
    Empty,
    /// Physical frame holding this slot's L2 table.
    Allocated(PhysicalPage<Size4K>),
}

impl RegionSlot {
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    #[inline]
    #[must_use]
    pub const fn table(self) -> Option<PhysicalPage<Size4K>> {
        match self {
            Self::Empty => None,
            Self::Allocated(page) => Some(page),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum RegionError {
    #[error("region of {npages} pages exceeds the {capacity} pages its slots can map")]
    RegionTooLarge { npages: usize, capacity: usize },
    #[error("out of physical memory")]
    OutOfMemory,
}

impl RegionError {
    /// "Argument list too long".
    pub const E2BIG: i32 = 7;
    /// "Out of memory".
    pub const ENOMEM: i32 = 12;

    /// Negated errno for C-ABI callers.
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::RegionTooLarge { .. } => -Self::E2BIG,
            Self::OutOfMemory => -Self::ENOMEM,
        }
    }
}

/// Number of slots holding a table.
#[must_use]
pub fn region_tables(slots: &[RegionSlot]) -> usize {
    slots.iter().filter(|s| !s.is_empty()).count()
}

/// Builds and tears down regions.
///
/// Holds the collaborators that stay fixed across calls. The frame allocator
/// is passed per call so its owner keeps control of it.
pub struct RegionManager<'a, M: PhysMapper, D: DataCache, I: InterruptControl + ?Sized> {
    mapper: &'a M,
    dcache: &'a D,
    irq: &'a I,
}

impl<'a, M: PhysMapper, D: DataCache, I: InterruptControl + ?Sized> RegionManager<'a, M, D, I> {
    #[must_use]
    pub const fn new(mapper: &'a M, dcache: &'a D, irq: &'a I) -> Self {
        Self {
            mapper,
            dcache,
            irq,
        }
    }

    /// Map `size` bytes at `vaddr` with freshly allocated frames.
    ///
    /// Returns the number of pages mapped, `ceil(size / 4096)`.
    ///
    /// # Errors
    /// - [`RegionError::RegionTooLarge`] if the pages don't fit into
    ///   `slots.len()` tables. Nothing is allocated.
    /// - [`RegionError::OutOfMemory`] if the allocator runs dry. Everything
    ///   built so far stays recorded in `slots`.
    ///
    /// # Panics
    /// If the allocator hands out physical address zero.
    pub fn create_region<A: FrameAlloc + ?Sized>(
        &self,
        alloc: &mut A,
        slots: &mut [RegionSlot],
        vaddr: VirtualAddress,
        size: usize,
        flags: MmuFlags,
    ) -> Result<usize, RegionError> {
        debug!(
            "create_region: listlen={} vaddr={vaddr} size={size:#x} flags={flags:?}",
            slots.len()
        );

        let capacity = slots.len().saturating_mul(ENTRIES_PER_L2TABLE);
        let npages = match pages_for(size) {
            Some(n) if n <= capacity => n,
            other => {
                let npages = other.unwrap_or(usize::MAX);
                error!("create_region: {npages} pages exceed {capacity} page capacity");
                return Err(RegionError::RegionTooLarge { npages, capacity });
            }
        };

        if !vaddr.is_aligned::<Size1M>() {
            warn!("create_region: {vaddr} is not section aligned");
        }

        let ntables = npages.div_ceil(ENTRIES_PER_L2TABLE);
        let mut vaddr = vaddr;
        let mut nmapped = 0usize;

        for (i, slot) in slots.iter_mut().take(ntables).enumerate() {
            let table_page = Self::alloc_frame(alloc)?;
            trace!("create_region: table {i} at {table_page}");
            *slot = RegionSlot::Allocated(table_page);

            let _cs = CriticalSection::enter(self.irq);

            // SAFETY: the frame was just handed to us, so nothing else refers to it.
            let table = unsafe { self.mapper.l2_table_mut(table_page) };
            table.zero();

            for _ in 0..ENTRIES_PER_L2TABLE {
                if nmapped >= size {
                    break;
                }

                let page = Self::alloc_frame(alloc)?;
                trace!("create_region: {vaddr} -> {page}");
                table.set(L2Index::from(vaddr), L2Entry::small_page(page, flags));

                nmapped += PAGE_SIZE as usize;
                vaddr = vaddr.wrapping_add(PAGE_SIZE);
            }

            self.dcache.flush_dcache(table.byte_range());
        }

        Ok(npages)
    }

    /// Release every table in `slots` and, unless `keep`, every frame the
    /// tables map. Slots end up [`Empty`](RegionSlot::Empty).
    ///
    /// Accepts the partial state left by a failed
    /// [`create_region`](Self::create_region). Calling it again is a no-op.
    pub fn destroy_region<A: FrameAlloc + ?Sized>(
        &self,
        alloc: &mut A,
        slots: &mut [RegionSlot],
        vaddr: VirtualAddress,
        keep: bool,
    ) {
        debug!(
            "destroy_region: listlen={} vaddr={vaddr} keep={keep}",
            slots.len()
        );

        let mut vaddr = vaddr;
        for slot in slots.iter_mut() {
            if let RegionSlot::Allocated(table_page) = *slot {
                {
                    let _cs = CriticalSection::enter(self.irq);
                    if !keep {
                        // SAFETY: the slot owns this table frame.
                        let table = unsafe { self.mapper.l2_table(table_page) };
                        for page in table.iter().filter_map(L2Entry::page) {
                            alloc.free_4k(page);
                        }
                    }
                }

                alloc.free_4k(table_page);
                *slot = RegionSlot::Empty;
                trace!("destroy_region: released table {table_page} for {vaddr}");
            }

            vaddr = vaddr.wrapping_add(SECTION_SIZE);
        }
    }

    /// Tear down the region of `segment` at its fixed base. Data frames of a
    /// shared segment stay with their owner.
    pub fn destroy_segment<A: FrameAlloc + ?Sized>(
        &self,
        alloc: &mut A,
        slots: &mut [RegionSlot],
        segment: Segment,
    ) {
        let layout = segment.layout();
        self.destroy_region(alloc, slots, layout.vbase, segment.is_shared());
    }

    /// Physical address backing `va` in the region built at `base`.
    #[must_use]
    pub fn translate(
        &self,
        slots: &[RegionSlot],
        base: VirtualAddress,
        va: VirtualAddress,
    ) -> Option<PhysicalAddress> {
        let page_index = (va.as_u32().checked_sub(base.as_u32())? >> PAGE_SHIFT) as usize;
        let table_page = slots.get(page_index / ENTRIES_PER_L2TABLE)?.table()?;

        // SAFETY: the slot owns this table frame; the table is only read.
        let table = unsafe { self.mapper.l2_table(table_page) };
        let page = table.get(L2Index::from(va)).page()?;
        Some(page.join(va.offset::<Size4K>()))
    }

    /// Populated entries across all tables of the region.
    #[must_use]
    pub fn mapped_pages(&self, slots: &[RegionSlot]) -> usize {
        slots
            .iter()
            .filter_map(|s| s.table())
            .map(|table_page| {
                // SAFETY: the slot owns this table frame; the table is only read.
                unsafe { self.mapper.l2_table(table_page) }.populated()
            })
            .sum()
    }

    fn alloc_frame<A: FrameAlloc + ?Sized>(
        alloc: &mut A,
    ) -> Result<PhysicalPage<Size4K>, RegionError> {
        let Some(page) = alloc.alloc_4k() else {
            error!("create_region: out of physical frames");
            return Err(RegionError::OutOfMemory);
        };
        assert!(
            !page.is_null(),
            "frame allocator returned physical address zero"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::L2Table;
    use crate::info::PGPOOL_PBASE;
    use std::cell::{Cell, RefCell, UnsafeCell};
    use std::collections::BTreeSet;
    use std::ops::Range;
    use std::rc::Rc;

    const BASE: VirtualAddress = VirtualAddress::new(0x8030_0000);
    const PAGE: usize = PAGE_SIZE as usize;

    #[repr(C, align(4096))]
    struct Frame(UnsafeCell<[u8; PAGE]>);

    /// Physical RAM starting at `PGPOOL_PBASE`.
    struct TestPhys {
        frames: Vec<Frame>,
    }

    impl TestPhys {
        fn new(n: usize) -> Self {
            Self {
                frames: (0..n).map(|_| Frame(UnsafeCell::new([0; PAGE]))).collect(),
            }
        }

        fn table(&self, page: PhysicalPage<Size4K>) -> &L2Table {
            unsafe { self.l2_table(page) }
        }
    }

    impl PhysMapper for TestPhys {
        unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
            let off = (pa.as_u32() - PGPOOL_PBASE) as usize;
            let frame = &self.frames[off / PAGE];
            unsafe { &mut *frame.0.get().cast::<u8>().add(off % PAGE).cast::<T>() }
        }
    }

    /// Shared view of the fake core's IRQ mask bit.
    type Mask = Rc<Cell<bool>>;

    struct FakeIrq {
        masked: Mask,
        enters: Cell<usize>,
    }

    impl InterruptControl for FakeIrq {
        type State = bool;

        fn save_and_disable(&self) -> bool {
            self.enters.set(self.enters.get() + 1);
            self.masked.replace(true)
        }

        unsafe fn restore(&self, state: bool) {
            self.masked.set(state);
        }
    }

    struct TestAlloc {
        limit: u32,
        next: u32,
        free: Vec<PhysicalPage<Size4K>>,
        live: BTreeSet<PhysicalPage<Size4K>>,
        calls: usize,
        fail_at: Option<usize>,
        hand_out_zero: bool,
        masked: Mask,
        masked_at: Vec<bool>,
    }

    impl TestAlloc {
        fn new(limit: usize, masked: Mask) -> Self {
            Self {
                limit: u32::try_from(limit).unwrap(),
                next: 0,
                free: Vec::new(),
                live: BTreeSet::new(),
                calls: 0,
                fail_at: None,
                hand_out_zero: false,
                masked,
                masked_at: Vec::new(),
            }
        }
    }

    impl FrameAlloc for TestAlloc {
        fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
            let call = self.calls;
            self.calls += 1;
            self.masked_at.push(self.masked.get());

            if self.fail_at == Some(call) {
                return None;
            }
            if self.hand_out_zero {
                return Some(PhysicalPage::from_frame_number(0));
            }

            let page = self.free.pop().or_else(|| {
                (self.next < self.limit).then(|| {
                    self.next += 1;
                    PhysicalPage::from_addr(PhysicalAddress::new(
                        PGPOOL_PBASE + (self.next - 1) * PAGE_SIZE,
                    ))
                })
            })?;
            assert!(self.live.insert(page));
            Some(page)
        }

        fn free_4k(&mut self, page: PhysicalPage<Size4K>) {
            assert!(self.live.remove(&page), "double or foreign free of {page}");
            self.free.push(page);
        }
    }

    #[derive(Default)]
    struct RecordingCache {
        masked: Mask,
        flushes: RefCell<Vec<(Range<usize>, bool)>>,
    }

    impl DataCache for RecordingCache {
        fn flush_dcache(&self, range: Range<usize>) {
            self.flushes.borrow_mut().push((range, self.masked.get()));
        }
    }

    struct Fixture {
        phys: TestPhys,
        alloc: TestAlloc,
        irq: FakeIrq,
        cache: RecordingCache,
    }

    impl Fixture {
        fn new(frames: usize) -> Self {
            let masked = Mask::default();
            Self {
                phys: TestPhys::new(frames),
                alloc: TestAlloc::new(frames, Rc::clone(&masked)),
                irq: FakeIrq {
                    masked: Rc::clone(&masked),
                    enters: Cell::new(0),
                },
                cache: RecordingCache {
                    masked,
                    flushes: RefCell::default(),
                },
            }
        }

        /// Every frame reachable from `slots`: the tables and what they map.
        fn reachable(&self, slots: &[RegionSlot]) -> BTreeSet<PhysicalPage<Size4K>> {
            let mut set = BTreeSet::new();
            for table_page in slots.iter().filter_map(|s| s.table()) {
                let table = self.phys.table(table_page);
                set.insert(table_page);
                set.extend(table.iter().filter_map(L2Entry::page));
            }
            set
        }
    }

    #[test]
    fn builds_one_frame_per_page() {
        let mut fx = Fixture::new(600);
        let mut slots = [RegionSlot::Empty; 4];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);

        let n = mgr
            .create_region(
                &mut fx.alloc,
                &mut slots,
                BASE,
                300 * PAGE - 100,
                MmuFlags::user_data(),
            )
            .unwrap();
        assert_eq!(n, 300);
        assert_eq!(mgr.mapped_pages(&slots), 300);
        assert_eq!(region_tables(&slots), 2);
        assert!(slots[2].is_empty() && slots[3].is_empty());
        assert_eq!(fx.alloc.calls, 302);

        let t0 = fx.phys.table(slots[0].table().unwrap());
        let t1 = fx.phys.table(slots[1].table().unwrap());
        assert_eq!(t0.populated(), 256);
        assert_eq!(t1.populated(), 44);
        assert!(t0.iter().all(|e| e.flags() == MmuFlags::user_data()));

        // Distinct, live frames, and exactly what the allocator has out.
        assert_eq!(fx.reachable(&slots), fx.alloc.live);
    }

    #[test]
    fn too_large_fails_before_allocating() {
        let mut fx = Fixture::new(16);
        let mut slots = [RegionSlot::Empty; 1];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);

        let err = mgr
            .create_region(
                &mut fx.alloc,
                &mut slots,
                BASE,
                257 * PAGE,
                MmuFlags::user_data(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegionError::RegionTooLarge {
                npages: 257,
                capacity: 256
            }
        );
        assert_eq!(fx.alloc.calls, 0);
        assert_eq!(region_tables(&slots), 0);
    }

    #[test]
    fn size_overflow_is_too_large() {
        let mut fx = Fixture::new(16);
        let mut slots = [RegionSlot::Empty; 1];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);

        let err = mgr
            .create_region(
                &mut fx.alloc,
                &mut slots,
                BASE,
                usize::MAX,
                MmuFlags::user_data(),
            )
            .unwrap_err();
        assert!(matches!(err, RegionError::RegionTooLarge { .. }));
        assert_eq!(fx.alloc.calls, 0);
    }

    #[test]
    fn exact_capacity_fills_every_table() {
        let mut fx = Fixture::new(600);
        let mut slots = [RegionSlot::Empty; 2];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);

        let n = mgr
            .create_region(
                &mut fx.alloc,
                &mut slots,
                BASE,
                512 * PAGE,
                MmuFlags::user_text(),
            )
            .unwrap();
        assert_eq!(n, 512);
        assert_eq!(mgr.mapped_pages(&slots), 512);
        assert_eq!(region_tables(&slots), 2);
    }

    #[test]
    fn zero_size_maps_nothing() {
        let mut fx = Fixture::new(4);
        let mut slots = [RegionSlot::Empty; 2];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);

        assert_eq!(
            mgr.create_region(&mut fx.alloc, &mut slots, BASE, 0, MmuFlags::user_data()),
            Ok(0)
        );
        assert_eq!(fx.alloc.calls, 0);
        assert_eq!(region_tables(&slots), 0);
        assert_eq!(fx.irq.enters.get(), 0);
    }

    #[test]
    fn exhaustion_leaves_reclaimable_partial_state() {
        // First table, first data page, second table, mid second table.
        for fail_at in [0, 1, 257, 300] {
            let mut fx = Fixture::new(600);
            fx.alloc.fail_at = Some(fail_at);
            let mut slots = [RegionSlot::Empty; 4];
            let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);

            let res = mgr.create_region(
                &mut fx.alloc,
                &mut slots,
                BASE,
                400 * PAGE,
                MmuFlags::user_data(),
            );
            assert_eq!(res, Err(RegionError::OutOfMemory), "fail_at={fail_at}");
            assert!(!fx.irq.masked.get(), "mask restored on the error path");
            assert_eq!(fx.alloc.live.len(), fail_at);
            assert_eq!(fx.reachable(&slots), fx.alloc.live, "fail_at={fail_at}");

            mgr.destroy_region(&mut fx.alloc, &mut slots, BASE, false);
            assert!(fx.alloc.live.is_empty(), "fail_at={fail_at}");
            assert!(slots.iter().all(|s| s.is_empty()));
        }
    }

    #[test]
    fn destroy_returns_every_frame() {
        let mut fx = Fixture::new(600);
        let mut slots = [RegionSlot::Empty; 3];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);

        mgr.create_region(
            &mut fx.alloc,
            &mut slots,
            BASE,
            520 * PAGE,
            MmuFlags::user_data(),
        )
        .unwrap();
        mgr.destroy_region(&mut fx.alloc, &mut slots, BASE, false);

        assert!(fx.alloc.live.is_empty());
        assert_eq!(fx.alloc.free.len(), 520 + 3);
        assert!(slots.iter().all(|s| s.is_empty()));
    }

    #[test]
    fn keep_releases_only_tables() {
        let mut fx = Fixture::new(600);
        let mut owner = [RegionSlot::Empty; 2];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);
        mgr.create_region(
            &mut fx.alloc,
            &mut owner,
            BASE,
            300 * PAGE,
            MmuFlags::user_shm(),
        )
        .unwrap();

        // A second address environment attaching the same pages.
        let mut sharer = [RegionSlot::Empty; 2];
        for (dst, src) in sharer.iter_mut().zip(owner) {
            let Some(src) = src.table() else { continue };
            let copy = fx.alloc.alloc_4k().unwrap();
            let (from, to) = (fx.phys.table(src), unsafe { fx.phys.l2_table_mut(copy) });
            to.zero();
            for (i, e) in from.iter().enumerate() {
                to.set(L2Index::new(u16::try_from(i).unwrap()), e);
            }
            *dst = RegionSlot::Allocated(copy);
        }
        let tables: BTreeSet<_> = owner.iter().filter_map(|s| s.table()).collect();
        let data: BTreeSet<_> = fx.reachable(&owner).difference(&tables).copied().collect();
        assert_eq!(data.len(), 300);

        mgr.destroy_region(&mut fx.alloc, &mut sharer, BASE, true);
        assert!(sharer.iter().all(|s| s.is_empty()));
        assert!(data.is_subset(&fx.alloc.live));
        assert_eq!(fx.alloc.live.len(), 302);

        mgr.destroy_region(&mut fx.alloc, &mut owner, BASE, false);
        assert!(fx.alloc.live.is_empty());
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut fx = Fixture::new(64);
        let mut slots = [RegionSlot::Empty; 2];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);
        mgr.create_region(
            &mut fx.alloc,
            &mut slots,
            BASE,
            10 * PAGE,
            MmuFlags::user_data(),
        )
        .unwrap();

        mgr.destroy_region(&mut fx.alloc, &mut slots, BASE, false);
        let (freed, calls, enters) = (fx.alloc.free.len(), fx.alloc.calls, fx.irq.enters.get());

        mgr.destroy_region(&mut fx.alloc, &mut slots, BASE, false);
        assert_eq!(fx.alloc.free.len(), freed);
        assert_eq!(fx.alloc.calls, calls, "no allocation on the second pass");
        assert_eq!(
            fx.irq.enters.get(),
            enters,
            "empty slots enter no critical section"
        );
        assert!(fx.alloc.live.is_empty());
    }

    #[test]
    fn destroy_of_never_built_slots_is_a_no_op() {
        let mut fx = Fixture::new(4);
        let mut slots = [RegionSlot::Empty; 3];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);

        mgr.destroy_region(&mut fx.alloc, &mut slots, BASE, false);
        mgr.destroy_region(&mut fx.alloc, &mut slots, BASE, true);
        assert_eq!(fx.alloc.calls, 0);
        assert!(fx.alloc.free.is_empty());
        assert_eq!(fx.irq.enters.get(), 0);
        assert!(fx.cache.flushes.borrow().is_empty());
    }

    #[test]
    fn segment_teardown_keeps_only_shared_pages() {
        let mut fx = Fixture::new(64);
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);

        let heap = Segment::Heap.layout();
        let mut heap_slots = vec![RegionSlot::Empty; heap.nsections];
        mgr.create_region(
            &mut fx.alloc,
            &mut heap_slots,
            heap.vbase,
            4 * PAGE,
            MmuFlags::for_segment(Segment::Heap),
        )
        .unwrap();

        let shm = Segment::Shm.layout();
        let mut shm_slots = vec![RegionSlot::Empty; shm.nsections];
        mgr.create_region(
            &mut fx.alloc,
            &mut shm_slots,
            shm.vbase,
            3 * PAGE,
            MmuFlags::for_segment(Segment::Shm),
        )
        .unwrap();
        let shared: BTreeSet<_> = (0..3u32)
            .filter_map(|i| mgr.translate(&shm_slots, shm.vbase, shm.vbase + i * PAGE_SIZE))
            .map(|pa| pa.page::<Size4K>())
            .collect();
        assert_eq!(shared.len(), 3);

        mgr.destroy_segment(&mut fx.alloc, &mut heap_slots, Segment::Heap);
        mgr.destroy_segment(&mut fx.alloc, &mut shm_slots, Segment::Shm);
        assert_eq!(fx.alloc.live, shared);
        assert_eq!(region_tables(&heap_slots) + region_tables(&shm_slots), 0);
    }

    #[test]
    fn data_frames_are_allocated_with_interrupts_masked() {
        let mut fx = Fixture::new(600);
        let mut slots = [RegionSlot::Empty; 2];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);
        mgr.create_region(
            &mut fx.alloc,
            &mut slots,
            BASE,
            260 * PAGE,
            MmuFlags::user_data(),
        )
        .unwrap();

        let masked = &fx.alloc.masked_at;
        assert_eq!(masked.len(), 262);
        // Table frames come first, outside the section; data frames inside.
        assert!(!masked[0]);
        assert!(masked[1..=256].iter().all(|&m| m));
        assert!(!masked[257]);
        assert!(masked[258..].iter().all(|&m| m));
        assert!(!fx.irq.masked.get());
        assert_eq!(fx.irq.enters.get(), 2);
    }

    #[test]
    fn one_flush_per_table_while_masked() {
        let mut fx = Fixture::new(600);
        let mut slots = [RegionSlot::Empty; 3];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);
        mgr.create_region(
            &mut fx.alloc,
            &mut slots,
            BASE,
            300 * PAGE,
            MmuFlags::user_data(),
        )
        .unwrap();

        let flushes = fx.cache.flushes.borrow();
        assert_eq!(flushes.len(), 2);
        for ((range, masked), slot) in flushes.iter().zip(slots) {
            let expected = fx.phys.table(slot.table().unwrap()).byte_range();
            assert_eq!(*range, expected);
            assert_eq!(range.len(), 1024);
            assert!(*masked);
        }
    }

    #[test]
    fn entry_index_follows_vaddr() {
        let mut fx = Fixture::new(16);
        let mut slots = [RegionSlot::Empty; 1];
        let base = VirtualAddress::new(0x8030_F000);
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);
        mgr.create_region(
            &mut fx.alloc,
            &mut slots,
            base,
            2 * PAGE,
            MmuFlags::user_data(),
        )
        .unwrap();

        let table = fx.phys.table(slots[0].table().unwrap());
        assert!(table.get(L2Index::new(15)).is_populated());
        assert!(table.get(L2Index::new(16)).is_populated());
        assert_eq!(table.populated(), 2);
    }

    #[test]
    fn translate_walks_the_slots() {
        let mut fx = Fixture::new(600);
        let mut slots = [RegionSlot::Empty; 2];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);
        mgr.create_region(
            &mut fx.alloc,
            &mut slots,
            BASE,
            300 * PAGE,
            MmuFlags::user_data(),
        )
        .unwrap();

        let va = BASE + 0x12_345;
        let entry = fx
            .phys
            .table(slots[0].table().unwrap())
            .get(L2Index::from(va));
        let pa = mgr.translate(&slots, BASE, va).unwrap();
        assert_eq!(pa.page::<Size4K>(), entry.page().unwrap());
        assert_eq!(pa.as_u32() & 0xFFF, 0x345);

        let last = BASE + (299 * PAGE as u32);
        assert!(mgr.translate(&slots, BASE, last).is_some());
        assert_eq!(mgr.translate(&slots, BASE, last + PAGE_SIZE), None);
        assert_eq!(mgr.translate(&slots, BASE, BASE + 2 * SECTION_SIZE), None);
        let below = VirtualAddress::new(0x8000_0000);
        assert_eq!(mgr.translate(&slots, BASE, below), None);
    }

    #[test]
    fn read_only_walks_share_the_table() {
        let mut fx = Fixture::new(16);
        let mut slots = [RegionSlot::Empty; 1];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);
        mgr.create_region(
            &mut fx.alloc,
            &mut slots,
            BASE,
            3 * PAGE,
            MmuFlags::user_data(),
        )
        .unwrap();

        // A held view stays valid across the manager's own walks.
        let table = fx.phys.table(slots[0].table().unwrap());
        assert_eq!(mgr.mapped_pages(&slots), table.populated());
        let pa = mgr.translate(&slots, BASE, BASE + PAGE_SIZE).unwrap();
        assert_eq!(Some(pa.page::<Size4K>()), table.get(L2Index::new(1)).page());
        assert_eq!(table.populated(), 3);
    }

    #[test]
    fn errno_matches_c_callers() {
        assert_eq!(RegionError::OutOfMemory.errno(), -12);
        let e = RegionError::RegionTooLarge {
            npages: 2,
            capacity: 1,
        };
        assert_eq!(e.errno(), -7);
    }

    #[test]
    #[should_panic(expected = "physical address zero")]
    fn null_frame_is_rejected() {
        let mut fx = Fixture::new(4);
        fx.alloc.hand_out_zero = true;
        let mut slots = [RegionSlot::Empty; 1];
        let mgr = RegionManager::new(&fx.phys, &fx.cache, &fx.irq);
        let flags = MmuFlags::user_data();
        let _ = mgr.create_region(&mut fx.alloc, &mut slots, BASE, PAGE, flags);
    }
}
