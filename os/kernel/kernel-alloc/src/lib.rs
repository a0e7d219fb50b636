//! # Kernel Page Pool
//!
//! Concrete collaborators for the region code in `kernel-vmem`: where frames
//! come from and how the kernel touches them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          Region builder / destroyer (kernel-vmem)   │
//! └──────────────┬──────────────────────┬───────────────┘
//!                │ FrameAlloc           │ PhysMapper
//! ┌──────────────▼──────────┐ ┌─────────▼───────────────┐
//! │   BitmapFrameAlloc      │ │   PgPoolMapper          │
//! │ • 1 bit per 4 KiB frame │ │ • PGPOOL_VBASE + offset │
//! │ • spin-locked, no heap  │ │ • always mapped         │
//! └─────────────────────────┘ └─────────────────────────┘
//! ```
//!
//! ### Physical Frame Allocator ([`frame_alloc`])
//! Tracks the page pool (`PGPOOL_PBASE`, `PGPOOL_SIZE` in `kernel-info`) with
//! a fixed bitmap. Never hands out physical address zero.
//!
//! ### Physical Mapper ([`phys_mapper`])
//! The page pool is permanently mapped at `PGPOOL_VBASE`, so any pool frame,
//! including a page table not yet linked into a directory, is writable at a
//! fixed offset.
//!
//! ## Usage
//! ```rust
//! use kernel_alloc::frame_alloc::BitmapFrameAlloc;
//! use kernel_vmem::FrameAlloc;
//!
//! let mut pool = BitmapFrameAlloc::pgpool();
//! let before = pool.free_frames();
//! if let Some(frame) = pool.alloc_4k() {
//!     assert!(!frame.is_null());
//!     pool.free_4k(frame);
//! }
//! assert_eq!(pool.free_frames(), before);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod frame_alloc;
pub mod phys_mapper;

pub use frame_alloc::{BitmapFrameAlloc, FrameAllocError};
pub use phys_mapper::PgPoolMapper;
