//! # Kernel synchronization primitives
//!
//! - [`CriticalSection`]: scoped interrupt masking over an [`InterruptControl`].
//! - [`SpinLock`]: TATAS spin lock.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
pub mod spin_lock;

pub use irq::{CriticalSection, InterruptControl, LocalIrq};
pub use spin_lock::{SpinLock, SpinLockGuard};
