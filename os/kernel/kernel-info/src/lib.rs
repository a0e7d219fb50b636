//! # Kernel Configuration
//!
//! Compile-time layout constants shared by the paging, allocation and
//! address-environment code. This crate is the single source of truth for
//! the `ARMv7-A` short-descriptor geometry and for where process segments live
//! in virtual memory.
//!
//! ## Modules
//!
//! ### Memory Layout ([`memory`])
//! * **Paging geometry**: small page size, section size, L2 table entries.
//! * **Page pool**: the physical range handed out by the page allocator and
//!   the always-mapped kernel window through which it is accessed.
//!
//! ### Address Environments ([`addrenv`])
//! * **Segments**: text, data, heap, stack and shared-memory regions of a
//!   process, each with a section-aligned virtual base and a maximum number
//!   of sections (and therefore L2 table slots) it may reserve.
//!
//! ```text
//! Per-process virtual layout (defaults):
//!
//! 0x8000_0000 ┌──────────────────────┐ TEXT   (2 sections)
//! 0x8020_0000 ├──────────────────────┤ DATA   (1 section)
//! 0x8030_0000 ├──────────────────────┤ HEAP   (16 sections)
//! 0x8130_0000 ├──────────────────────┤ STACK  (1 section)
//! 0x8140_0000 ├──────────────────────┤ SHM    (8 sections)
//! 0x81C0_0000 └──────────────────────┘
//! ```
//!
//! All values are `const` and checked by compile-time assertions.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod addrenv;
pub mod memory;
