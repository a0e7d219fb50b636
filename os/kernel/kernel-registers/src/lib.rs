//! # Typed `ARMv7-A` Registers
//!
//! Bitfield models of the few system registers the memory code touches, plus
//! the CP15 data-cache maintenance operations needed to publish page tables
//! to a table walker that does not snoop the data cache.
//!
//! Register access (`asm` feature) is only compiled for `target_arch = "arm"`;
//! on other targets the bitfield types remain available for decoding.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cache")]
pub mod cache;

#[cfg(feature = "cpsr")]
pub mod cpsr;

#[cfg(feature = "ctr")]
pub mod ctr;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require a
    /// privileged processor mode (PL1).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require a
    /// privileged processor mode (PL1).
    unsafe fn store_unsafe(self);
}

pub trait LoadRegister {
    /// # Safety
    /// It is generally safe to load this register even from user mode.
    fn load() -> Self;
}

pub trait StoreRegister {
    /// # Safety
    /// It is generally safe to store this register even from user mode.
    fn store(self);
}

impl<T> LoadRegisterUnsafe for T
where
    T: LoadRegister,
{
    #[inline]
    unsafe fn load_unsafe() -> Self {
        <Self as LoadRegister>::load()
    }
}

impl<T> StoreRegisterUnsafe for T
where
    T: StoreRegister,
{
    #[inline]
    unsafe fn store_unsafe(self) {
        <Self as StoreRegister>::store(self);
    }
}
