//! Memory management module
//!
//! Owns the physical frame allocator, the per-process virtual address space,
//! and the virtual-memory core: the supplemental page table, the system-wide
//! frame table, the eviction policy, and the swap store.

#![allow(dead_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

use core::sync::atomic::{AtomicU64, Ordering};

pub mod bootloader;
pub mod eviction;
pub mod frame_allocator;
pub mod frame_table;
pub mod heap;
pub mod page_fault;
pub mod page_table;
pub mod spt;
pub mod swap;
pub mod user_validation;
pub mod vas;
pub mod vmm;

pub use frame_allocator::{
    FrameAllocator, FrameAllocatorError, FrameNumber, PhysicalAddress, PhysicalFrame,
    FRAME_ALLOCATOR, FRAME_SIZE,
};
pub use vas::VirtualAddressSpace;

/// Size of a page, in bytes. Identical to [`FRAME_SIZE`]; kept as a separate
/// name because the virtual-memory core speaks of "pages" and the physical
/// allocator speaks of "frames".
pub const PAGE_SIZE: usize = FRAME_SIZE;

/// Disk sectors backing one swapped page. Matches a 512-byte sector device.
pub const SECTORS_PER_PAGE: usize = PAGE_SIZE / 512;

/// Bytes below `esp` within which a fault is treated as stack growth rather
/// than a segfault. Covers the `PUSH`/`PUSHA` prefetch window.
pub const STACK_HEURISTIC: u64 = 32;

/// Upper bound on a single process's stack growth.
pub const MAX_STACK_SIZE: u64 = 8 * 1024 * 1024;

/// Virtual memory address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VirtualAddress(pub u64);

impl VirtualAddress {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    pub fn add(&self, offset: usize) -> Self {
        Self(self.0 + offset as u64)
    }

    /// Round down to the containing page.
    pub fn page_align_down(&self) -> Self {
        Self(self.0 & !(PAGE_SIZE as u64 - 1))
    }
}

/// Page size options
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    /// 4 KiB pages
    Small = 4096,
    /// 2 MiB pages
    Large = 2 * 1024 * 1024,
    /// 1 GiB pages
    Huge = 1024 * 1024 * 1024,
}

/// Page flags
#[derive(Debug, Clone, Copy)]
pub struct PageFlags(pub u64);

impl PageFlags {
    pub const PRESENT: Self = Self(1 << 0);
    pub const WRITABLE: Self = Self(1 << 1);
    pub const USER: Self = Self(1 << 2);
    pub const WRITE_THROUGH: Self = Self(1 << 3);
    pub const NO_CACHE: Self = Self(1 << 4);
    pub const ACCESSED: Self = Self(1 << 5);
    pub const DIRTY: Self = Self(1 << 6);
    pub const HUGE: Self = Self(1 << 7);
    pub const GLOBAL: Self = Self(1 << 8);
    pub const NO_EXECUTE: Self = Self(1 << 63);

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for PageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for PageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A simple usable/unusable memory region reported by the bootloader.
#[derive(Debug, Clone, Copy)]
pub struct MemoryRegion {
    pub start: u64,
    pub size: u64,
    pub usable: bool,
}

/// Offset added to a physical address to reach its identity-mapped kernel
/// virtual address. Set once at boot from the bootloader's physical memory
/// offset; zero means "not yet initialized" (identity mapping assumed).
pub static PHYS_MEM_OFFSET: AtomicU64 = AtomicU64::new(0);

/// Convert a physical address to the kernel virtual address that maps it.
pub fn phys_to_virt_addr(phys: u64) -> usize {
    (phys + PHYS_MEM_OFFSET.load(Ordering::Acquire)) as usize
}

/// Convert a kernel virtual address, previously obtained from
/// [`phys_to_virt_addr`], back to its physical address.
pub fn virt_to_phys_addr(virt: usize) -> u64 {
    virt as u64 - PHYS_MEM_OFFSET.load(Ordering::Acquire)
}

pub mod pagedir;

/// Allocate a single frame from the user pool.
///
/// Returns the frame's kernel virtual address. If `zeroed` is set, the frame
/// is cleared before being handed back.
pub fn alloc_user_frame(zeroed: bool) -> Option<u64> {
    let frame = FRAME_ALLOCATOR.lock().allocate_frames(1, None).ok()?;
    let kaddr = phys_to_virt_addr(frame.as_u64() << 12);
    if zeroed {
        // SAFETY: the frame was just allocated from the user pool and is not
        // referenced by any other mapping yet, so writing PAGE_SIZE zero
        // bytes at its kernel virtual address is sound.
        unsafe {
            core::ptr::write_bytes(kaddr as *mut u8, 0, PAGE_SIZE);
        }
    }
    Some(kaddr as u64)
}

/// Return a frame previously obtained from [`alloc_user_frame`] to the pool.
pub fn free_user_frame(frame_kaddr: u64) {
    let phys = virt_to_phys_addr(frame_kaddr as usize);
    let frame = FrameNumber::new(phys >> 12);
    let _ = FRAME_ALLOCATOR.lock().free_frames(frame, 1);
}

/// Initialize memory management: frame allocator, kernel page tables, heap,
/// and the virtual-memory core (frame table, swap store).
pub fn init() {
    log::info!("[mm] initializing memory management");
    frame_table::init();
    swap::init_uninitialized();
    log::info!("[mm] memory management initialized");
}
