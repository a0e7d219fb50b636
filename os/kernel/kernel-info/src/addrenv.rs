//! # Address Environment Layout
//!
//! Where each process segment lives and how many L2 table slots its region
//! may reserve. The address-environment owner sizes its slot arrays from
//! [`SegmentLayout::nsections`].

use crate::memory::SECTION_SIZE;
use kernel_memory_addresses::VirtualAddress;

/// A private segment of a process address environment.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Segment {
    /// Program text (read-only, executable).
    Text,
    /// Initialized and zero-initialized program data.
    Data,
    /// Process heap.
    Heap,
    /// Main thread stack.
    Stack,
    /// Shared-memory attachments; backing pages are owned elsewhere.
    Shm,
}

/// Virtual placement of one [`Segment`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SegmentLayout {
    /// Section-aligned virtual base.
    pub vbase: VirtualAddress,
    /// Number of sections, i.e. the slot-array length for this segment.
    pub nsections: usize,
}

pub const TEXT_VBASE: u32 = 0x8000_0000;
pub const TEXT_NSECTIONS: usize = 2;

pub const DATA_VBASE: u32 = 0x8020_0000;
pub const DATA_NSECTIONS: usize = 1;

pub const HEAP_VBASE: u32 = 0x8030_0000;
pub const HEAP_NSECTIONS: usize = 16;

pub const STACK_VBASE: u32 = 0x8130_0000;
pub const STACK_NSECTIONS: usize = 1;

pub const SHM_VBASE: u32 = 0x8140_0000;
pub const SHM_NSECTIONS: usize = 8;

/// Largest slot array any segment needs.
pub const MAX_SEGMENT_NSECTIONS: usize = HEAP_NSECTIONS;

impl Segment {
    /// All segments in ascending virtual order.
    pub const ALL: [Self; 5] = [Self::Text, Self::Data, Self::Heap, Self::Stack, Self::Shm];

    #[must_use]
    pub const fn layout(self) -> SegmentLayout {
        let (vbase, nsections) = match self {
            Self::Text => (TEXT_VBASE, TEXT_NSECTIONS),
            Self::Data => (DATA_VBASE, DATA_NSECTIONS),
            Self::Heap => (HEAP_VBASE, HEAP_NSECTIONS),
            Self::Stack => (STACK_VBASE, STACK_NSECTIONS),
            Self::Shm => (SHM_VBASE, SHM_NSECTIONS),
        };
        SegmentLayout {
            vbase: VirtualAddress::new(vbase),
            nsections,
        }
    }

    /// Whether the backing pages of this segment may be shared with other
    /// address environments and must survive teardown.
    #[must_use]
    pub const fn is_shared(self) -> bool {
        matches!(self, Self::Shm)
    }
}

impl SegmentLayout {
    /// Size of the virtual span reserved for the segment, in bytes.
    #[must_use]
    pub const fn span(self) -> usize {
        self.nsections * SECTION_SIZE as usize
    }

    /// Exclusive end of the reserved span.
    #[must_use]
    pub const fn end(self) -> u64 {
        self.vbase.as_u32() as u64 + self.span() as u64
    }
}

const _: () = {
    let mut i = 0;
    while i < Segment::ALL.len() {
        let l = Segment::ALL[i].layout();
        assert!(l.vbase.as_u32().is_multiple_of(SECTION_SIZE));
        assert!(l.nsections > 0 && l.nsections <= MAX_SEGMENT_NSECTIONS);
        assert!(l.end() <= u32::MAX as u64 + 1);
        if i + 1 < Segment::ALL.len() {
            assert!(l.end() <= Segment::ALL[i + 1].layout().vbase.as_u32() as u64);
        }
        i += 1;
    }
};
