//! Bitmap allocator over the physical page pool.

use kernel_info::memory::{PAGE_SIZE, PGPOOL_FRAMES, PGPOOL_PBASE};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use kernel_sync::SpinLock;
use kernel_vmem::FrameAlloc;
use log::warn;

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = PGPOOL_FRAMES.div_ceil(WORD_BITS);

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FrameAllocError {
    #[error("page pool must not start at physical address zero")]
    ZeroBase,
    #[error("page pool base {0:?} is not page aligned")]
    Unaligned(PhysicalAddress),
    #[error("page pool of {frames} frames exceeds the {max} frames that can be tracked")]
    PoolTooLarge { frames: usize, max: usize },
}

struct Pool {
    base: u32,
    frames: usize,
    free: usize,
    /// Lowest word that may contain a clear bit.
    hint: usize,
    /// Set bit = frame in use. Bits past `frames` are permanently set.
    used: [u64; WORDS],
}

impl Pool {
    const fn new(base: u32, frames: usize) -> Self {
        let mut used = [0u64; WORDS];
        let mut i = frames;
        while i < WORDS * WORD_BITS {
            used[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
            i += 1;
        }
        Self {
            base,
            frames,
            free: frames,
            hint: 0,
            used,
        }
    }

    fn alloc(&mut self) -> Option<PhysicalPage<Size4K>> {
        let (w, word) = self
            .used
            .iter_mut()
            .enumerate()
            .skip(self.hint)
            .find(|(_, word)| **word != u64::MAX)?;

        let bit = word.trailing_ones() as usize;
        *word |= 1u64 << bit;
        self.free -= 1;
        self.hint = w;

        let index = w * WORD_BITS + bit;
        Some(PhysicalPage::from_addr(self.address_of(index)))
    }

    fn free(&mut self, page: PhysicalPage<Size4K>) {
        let Some(index) = self.index_of(page) else {
            warn!("frame_alloc: ignoring free of foreign frame {page}");
            return;
        };

        let (w, mask) = (index / WORD_BITS, 1u64 << (index % WORD_BITS));
        if self.used[w] & mask == 0 {
            warn!("frame_alloc: ignoring double free of {page}");
            return;
        }

        self.used[w] &= !mask;
        self.free += 1;
        self.hint = self.hint.min(w);
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn address_of(&self, index: usize) -> PhysicalAddress {
        // Bounded by `frames`, which `new` checked against the 32-bit space.
        PhysicalAddress::new(self.base + (index as u32) * PAGE_SIZE)
    }

    fn index_of(&self, page: PhysicalPage<Size4K>) -> Option<usize> {
        let offset = page.base().as_u32().checked_sub(self.base)?;
        let index = (offset / PAGE_SIZE) as usize;
        (index < self.frames).then_some(index)
    }
}

/// Hands out 4 KiB frames from a contiguous physical range, one bit each.
///
/// The bitmap lives inside the allocator, so it needs no heap. Interior
/// locking lets a shared `&BitmapFrameAlloc` serve as a [`FrameAlloc`] too.
///
/// Invalid frees (outside the pool, or already free) are logged and ignored.
pub struct BitmapFrameAlloc {
    pool: SpinLock<Pool>,
}

impl BitmapFrameAlloc {
    /// Largest pool the bitmap can track.
    pub const MAX_FRAMES: usize = WORDS * WORD_BITS;

    /// Manage `frames` frames starting at `base`.
    ///
    /// # Errors
    /// - [`FrameAllocError::ZeroBase`] if `base` is zero.
    /// - [`FrameAllocError::Unaligned`] if `base` is not 4 KiB aligned.
    /// - [`FrameAllocError::PoolTooLarge`] if the bitmap is too small or the
    ///   range runs past the 32-bit physical space.
    pub fn new(base: PhysicalAddress, frames: usize) -> Result<Self, FrameAllocError> {
        if base.as_u32() == 0 {
            return Err(FrameAllocError::ZeroBase);
        }
        if !base.is_aligned::<Size4K>() {
            return Err(FrameAllocError::Unaligned(base));
        }

        let span = u64::from(u32::MAX) + 1 - u64::from(base.as_u32());
        let addressable = usize::try_from(span / u64::from(PAGE_SIZE)).unwrap_or(usize::MAX);
        let max = Self::MAX_FRAMES.min(addressable);
        if frames > max {
            return Err(FrameAllocError::PoolTooLarge { frames, max });
        }

        Ok(Self {
            pool: SpinLock::new(Pool::new(base.as_u32(), frames)),
        })
    }

    /// The whole page pool as laid out in `kernel-info`.
    #[must_use]
    pub const fn pgpool() -> Self {
        Self {
            pool: SpinLock::new(Pool::new(PGPOOL_PBASE, PGPOOL_FRAMES)),
        }
    }

    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.pool.with_lock(|p| p.free)
    }

    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.pool.with_lock(|p| p.frames)
    }

    /// Whether `page` belongs to this pool.
    #[must_use]
    pub fn contains(&self, page: PhysicalPage<Size4K>) -> bool {
        self.pool.with_lock(|p| p.index_of(page).is_some())
    }
}

impl FrameAlloc for &BitmapFrameAlloc {
    #[inline]
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        self.pool.with_lock(Pool::alloc)
    }

    #[inline]
    fn free_4k(&mut self, page: PhysicalPage<Size4K>) {
        self.pool.with_lock(|p| p.free(page));
    }
}

impl FrameAlloc for BitmapFrameAlloc {
    #[inline]
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        self.pool.get_mut().alloc()
    }

    #[inline]
    fn free_4k(&mut self, page: PhysicalPage<Size4K>) {
        self.pool.get_mut().free(page);
    }
}
