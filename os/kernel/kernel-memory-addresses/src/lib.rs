//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw 32-bit memory addresses and page bases used
//! by the `ARMv7-A` short-descriptor paging code.
//!
//! ## Overview
//!
//! The types prevent mixing virtual and physical addresses at compile time
//! while remaining zero-cost wrappers around `u32` values:
//!
//! | Concept | Generic | Description |
//! |----------|----------|-------------|
//! | [`MemoryAddress`] | – | A raw 32-bit address, either physical or virtual. |
//! | [`MemoryPage<S>`] | [`S: PageSize`](PageSize) | A page-aligned base address of a page of size `S`. |
//! | [`MemoryAddressOffset<S>`] | [`S: PageSize`](PageSize) | An offset within a page of size `S`. |
//!
//! These are then wrapped to distinguish between virtual and physical spaces:
//!
//! | Wrapper | Meaning |
//! |----------|----------|
//! | [`VirtualAddress`] | Refers to virtual (page-table translated) memory. |
//! | [`PhysicalAddress`] / [`PhysicalPage<S>`] | Refer to physical memory or MMIO regions. |
//!
//! ## Page Sizes
//!
//! - [`Size4K`]: 4 KiB small pages, the unit mapped by one L2 entry.
//! - [`Size1M`]: 1 MiB sections, the span covered by one L2 table.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x8012_3456);
//! let (page, off) = va.split::<Size4K>();
//! assert_eq!(page.base().as_u32(), 0x8012_3000);
//! assert_eq!(off.as_u32(), 0x456);
//!
//! let pa = PhysicalAddress::new(0x6010_2042);
//! let pp = pa.page::<Size4K>();
//! assert_eq!(pp.join(pa.offset::<Size4K>()), pa);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod memory_address;
mod memory_page;
mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;

pub use memory_address::{MemoryAddress, MemoryAddressOffset};
pub use memory_page::MemoryPage;
pub use page_size::{PageSize, Size1M, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
