/// Local interrupt masking primitive.
///
/// `save_and_disable` snapshots the current mask state and masks interrupts;
/// `restore` puts back **exactly** the snapshot. Because restore never
/// unconditionally unmasks, critical sections nest: an inner section entered
/// with interrupts already masked restores "masked" on exit.
pub trait InterruptControl {
    /// Saved interrupt state.
    type State: Copy;

    /// Save the current state and mask interrupts.
    fn save_and_disable(&self) -> Self::State;

    /// Restore a state previously returned by [`save_and_disable`](Self::save_and_disable).
    ///
    /// # Safety
    /// `state` must come from `save_and_disable` on the same core, and
    /// sections must be restored in LIFO order.
    unsafe fn restore(&self, state: Self::State);
}

/// RAII critical section: masks interrupts on creation, restores the saved
/// state on drop.
///
/// The restore runs on every exit path of the owning scope, including early
/// returns through `?`.
///
/// # Examples
///
/// ```no_run
/// # use kernel_sync::irq::{CriticalSection, InterruptControl};
/// # fn demo<C: InterruptControl>(ctl: &C) {
/// {
///     let _cs = CriticalSection::enter(ctl);
///     // interrupt handlers on this core cannot run here
/// }
/// // prior interrupt state restored
/// # }
/// ```
#[must_use = "dropping the guard immediately ends the critical section"]
pub struct CriticalSection<'a, C: InterruptControl + ?Sized> {
    ctl: &'a C,
    saved: C::State,
}

impl<'a, C: InterruptControl + ?Sized> CriticalSection<'a, C> {
    #[inline]
    pub fn enter(ctl: &'a C) -> Self {
        let saved = ctl.save_and_disable();
        Self { ctl, saved }
    }
}

impl<C: InterruptControl + ?Sized> Drop for CriticalSection<'_, C> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: `saved` came from `save_and_disable` in `enter`; guards are
        // scoped, so drops happen in LIFO order.
        unsafe { self.ctl.restore(self.saved) }
    }
}

/// IRQ masking on the local `ARMv7-A` core via the CPSR `I` bit.
///
/// `save_and_disable` reads CPSR and executes `cpsid i`; `restore` writes the
/// saved control field back (`msr cpsr_c`), so a section entered with IRQs
/// already masked leaves them masked.
///
/// # Safety & Privilege
///
/// Must only be used in a privileged mode where `cpsid`/`msr cpsr_c` are legal.
#[derive(Copy, Clone, Debug, Default)]
pub struct LocalIrq;

#[cfg(target_arch = "arm")]
impl InterruptControl for LocalIrq {
    type State = kernel_registers::cpsr::Cpsr;

    #[inline]
    fn save_and_disable(&self) -> Self::State {
        use kernel_registers::LoadRegisterUnsafe;
        // SAFETY: the kernel runs in a privileged mode.
        unsafe {
            let saved = kernel_registers::cpsr::Cpsr::load_unsafe();
            kernel_registers::cpsr::disable_irq();
            saved
        }
    }

    #[inline]
    unsafe fn restore(&self, state: Self::State) {
        use kernel_registers::StoreRegisterUnsafe;
        unsafe { state.store_unsafe() }
    }
}
