use bitfield_struct::bitfield;

/// Cache Type Register (CTR, `c0, c0, 1`), `ARMv7` format.
#[bitfield(u32, order = Lsb)]
pub struct Ctr {
    /// `log2` of the number of words in the smallest instruction cache line.
    #[bits(4)]
    pub imin_line: u8, // 0–3

    #[bits(10)]
    _reserved0: u16, // 4–13

    /// Level 1 instruction cache policy.
    #[bits(2)]
    pub l1_ip: u8, // 14–15

    /// `log2` of the number of words in the smallest data cache line.
    #[bits(4)]
    pub dmin_line: u8, // 16–19

    /// Exclusives reservation granule.
    #[bits(4)]
    pub erg: u8, // 20–23

    /// Cache writeback granule.
    #[bits(4)]
    pub cwg: u8, // 24–27

    #[bits(1)]
    _reserved1: u8, // 28

    /// Register format; `0b100` for `ARMv7`.
    #[bits(3)]
    pub format: u8, // 29–31
}

impl Ctr {
    /// Smallest data cache line in bytes.
    #[inline]
    #[must_use]
    pub const fn dcache_line_size(self) -> usize {
        4 << (self.dmin_line() as u32)
    }
}

#[cfg(all(feature = "asm", target_arch = "arm"))]
impl crate::LoadRegister for Ctr {
    fn load() -> Self {
        let ctr: u32;
        // SAFETY: CTR is readable at PL1 and, on ARMv7, from user mode when SCTLR.UCT is set.
        unsafe {
            core::arch::asm!("mrc p15, 0, {}, c0, c0, 1", out(reg) ctr, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(ctr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cortex_a9_line_size() {
        // Cortex-A9: DminLine = 3 (8 words, 32 bytes).
        let ctr = Ctr::from_bits(0x8303_C003);
        assert_eq!(ctr.format(), 0b100);
        assert_eq!(ctr.dcache_line_size(), 32);
    }
}
