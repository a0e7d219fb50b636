use bitfield_struct::bitfield;

/// Current Program Status Register (CPSR).
///
/// Only the mask bits `I`, `F` and `A` are of interest to the kernel's
/// critical sections; the rest is modeled so a saved value round-trips
/// unchanged.
#[bitfield(u32, order = Lsb)]
pub struct Cpsr {
    /// Processor mode `M[4:0]` (e.g. `0b10011` = Supervisor).
    #[bits(5)]
    pub mode: u8, // 0–4

    /// Thumb execution state.
    pub t_thumb: bool, // 5

    /// FIQ mask; set = FIQs masked.
    pub f_fiq_masked: bool, // 6

    /// IRQ mask; set = IRQs masked.
    pub i_irq_masked: bool, // 7

    /// Asynchronous abort mask.
    pub a_abort_masked: bool, // 8

    /// Data endianness (set = big endian).
    pub e_big_endian: bool, // 9

    /// If-Then state `IT[7:2]`.
    #[bits(6)]
    pub it_hi: u8, // 10–15

    /// SIMD greater-than-or-equal flags.
    #[bits(4)]
    pub ge: u8, // 16–19

    #[bits(4)]
    _reserved: u8, // 20–23

    /// Jazelle state.
    pub j_jazelle: bool, // 24

    /// If-Then state `IT[1:0]`.
    #[bits(2)]
    pub it_lo: u8, // 25–26

    /// Cumulative saturation.
    pub q_saturation: bool, // 27

    pub v_overflow: bool, // 28
    pub c_carry: bool,    // 29
    pub z_zero: bool,     // 30
    pub n_negative: bool, // 31
}

/// Supervisor mode encoding of [`Cpsr::mode`].
pub const MODE_SVC: u8 = 0b10011;

#[cfg(all(feature = "asm", target_arch = "arm"))]
impl crate::LoadRegisterUnsafe for Cpsr {
    unsafe fn load_unsafe() -> Self {
        let cpsr: u32;
        unsafe {
            core::arch::asm!("mrs {}, cpsr", out(reg) cpsr, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cpsr)
    }
}

#[cfg(all(feature = "asm", target_arch = "arm"))]
impl crate::StoreRegisterUnsafe for Cpsr {
    /// Writes the control field (`cpsr_c`: mode and mask bits) only.
    unsafe fn store_unsafe(self) {
        unsafe {
            core::arch::asm!("msr cpsr_c, {}", in(reg) self.into_bits(), options(nomem, nostack));
        }
    }
}

/// Masks IRQs on the local core (`cpsid i`).
///
/// # Safety
/// Requires a privileged mode.
#[cfg(all(feature = "asm", target_arch = "arm"))]
#[inline]
pub unsafe fn disable_irq() {
    unsafe { core::arch::asm!("cpsid i", options(nomem, nostack, preserves_flags)) }
}
