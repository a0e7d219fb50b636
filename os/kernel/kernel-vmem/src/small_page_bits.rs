use crate::addresses::{PhysicalAddress, PhysicalPage, Size4K};
use bitfield_struct::bitfield;

/// `ARMv7-A` short-descriptor small-page entry (L2, 4 KiB) in raw bitfield form.
///
/// ### Bit layout
///
/// | Bits  | Name     | Meaning |
/// |-------|----------|---------|
/// | 0     | `XN`     | Execute never |
/// | 1     | type     | `1` for a small page |
/// | 2     | `B`      | Bufferable |
/// | 3     | `C`      | Cacheable |
/// | 4–5   | `AP[1:0]`| Access permissions |
/// | 6–8   | `TEX`    | Type extension (memory attributes) |
/// | 9     | `AP[2]`  | Read-only when set (`APX`) |
/// | 10    | `S`      | Shareable |
/// | 11    | `nG`     | Not global (ASID tagged) |
/// | 12–31 | base     | Physical frame bits `[31:12]` |
///
/// A descriptor of all zeros is a translation fault; the region code relies
/// on that as the "empty" marker.
///
/// ### Example
/// ```rust
/// # use kernel_vmem::SmallPageBits;
/// # use kernel_vmem::addresses::PhysicalAddress;
/// let e = SmallPageBits::new()
///     .with_small(true)
///     .with_execute_never(true)
///     .with_physical_address(PhysicalAddress::new(0x6100_3000));
/// assert_eq!(u32::from(e), 0x6100_3003);
/// ```
#[bitfield(u32)]
pub struct SmallPageBits {
    /// Execute never (XN, bit 0).
    pub execute_never: bool,

    /// Descriptor type (bit 1). Set for a small page.
    pub small: bool,

    /// Bufferable (B, bit 2).
    pub bufferable: bool,

    /// Cacheable (C, bit 3).
    pub cacheable: bool,

    /// Access permissions `AP[1:0]` (bits 4..=5).
    ///
    /// With `AP[2]` clear: `01` kernel RW, `10` kernel RW / user RO,
    /// `11` kernel RW / user RW.
    #[bits(2)]
    pub access: u8,

    /// Type extension (TEX, bits 6..=8).
    #[bits(3)]
    pub tex: u8,

    /// `AP[2]` (bit 9). Makes the mapping read-only at every privilege level.
    pub read_only: bool,

    /// Shareable (S, bit 10).
    pub shareable: bool,

    /// Not global (nG, bit 11).
    pub not_global: bool,

    /// Physical frame number (bits 12..=31).
    #[bits(20)]
    frame: u32,
}

impl SmallPageBits {
    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame() << 12)
    }

    #[inline]
    pub const fn set_physical_address(&mut self, phys: PhysicalAddress) {
        self.set_frame(phys.as_u32() >> 12);
    }

    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, phys: PhysicalAddress) -> Self {
        self.set_physical_address(phys);
        self
    }

    #[inline]
    #[must_use]
    pub const fn page(&self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_frame_number(self.frame())
    }
}
