//! Page-directory primitives consumed by the virtual-memory core.
//!
//! Thin wrappers around [`super::page_table`] that operate on a raw L4
//! physical root address rather than requiring callers to hold a
//! [`super::page_table::PageMapper`]. Mirrors the PintOS `pagedir.c`
//! interface: `install_page`, `pagedir_clear_page`,
//! `pagedir_is_dirty`/`is_accessed`, `pagedir_set_dirty`/`set_accessed`,
//! `pagedir_get_page`.

use super::page_table::{PageTable, PageTableEntry, VirtualAddressBreakdown};
use super::{phys_to_virt_addr, FrameNumber, PageFlags, VirtualAddress, FRAME_ALLOCATOR};

/// Walk the four-level page table rooted at `root` down to the leaf entry
/// for `vaddr`. When `create` is set, missing intermediate tables are
/// allocated and zeroed; otherwise a missing table yields `None`.
///
/// # Safety
///
/// `root` must be the physical address of a valid, live L4 table for some
/// address space, identity-accessible through [`phys_to_virt_addr`].
unsafe fn walk(root: u64, vaddr: VirtualAddress, create: bool) -> Option<*mut PageTableEntry> {
    let breakdown = VirtualAddressBreakdown::new(vaddr);

    // SAFETY: `root` is a valid L4 table physical address per the caller
    // contract; phys_to_virt_addr maps it into the kernel's identity window.
    let l4 = unsafe { &mut *(phys_to_virt_addr(root) as *mut PageTable) };
    let next = |entry: &mut PageTableEntry, create: bool| -> Option<u64> {
        if !entry.is_present() {
            if !create {
                return None;
            }
            let frame = FRAME_ALLOCATOR.lock().allocate_frames(1, None).ok()?;
            let phys = frame.as_u64() << 12;
            // SAFETY: freshly allocated frame, not yet referenced elsewhere.
            unsafe {
                core::ptr::write_bytes(phys_to_virt_addr(phys) as *mut u8, 0, super::PAGE_SIZE);
            }
            entry.set(
                FrameNumber::new(phys >> 12),
                PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::USER,
            );
        }
        Some(entry.addr().unwrap().as_u64())
    };

    let l3_phys = next(&mut l4[breakdown.l4_index], create)?;
    let l3 = unsafe { &mut *(phys_to_virt_addr(l3_phys) as *mut PageTable) };
    let l2_phys = next(&mut l3[breakdown.l3_index], create)?;
    let l2 = unsafe { &mut *(phys_to_virt_addr(l2_phys) as *mut PageTable) };
    let l1_phys = next(&mut l2[breakdown.l2_index], create)?;
    let l1 = unsafe { &mut *(phys_to_virt_addr(l1_phys) as *mut PageTable) };

    Some(&mut l1[breakdown.l1_index] as *mut PageTableEntry)
}

/// Install a mapping `upage -> frame_kaddr` in the address space rooted at
/// `root`. Returns `false` if the page is already mapped.
pub fn install_page(root: u64, upage: VirtualAddress, frame_kaddr: u64, writable: bool) -> bool {
    // SAFETY: root is the caller's own address space root, obtained from
    // VirtualAddressSpace::get_page_table().
    let entry = unsafe { walk(root, upage, true) };
    let Some(entry) = entry else {
        return false;
    };
    // SAFETY: `entry` was just produced by `walk` and points into a live
    // page table that the caller (holding the process's memory-space lock)
    // has exclusive access to.
    let entry = unsafe { &mut *entry };
    if entry.is_present() {
        return false;
    }
    let frame_phys = super::virt_to_phys_addr(frame_kaddr as usize);
    let mut flags = PageFlags::PRESENT | PageFlags::USER;
    if writable {
        flags |= PageFlags::WRITABLE;
    }
    entry.set(FrameNumber::new(frame_phys >> 12), flags);
    super::vmm::tlb::flush_address(upage);
    true
}

/// Clear the mapping for `upage`, returning the frame's kernel virtual
/// address if one was mapped.
pub fn pagedir_clear_page(root: u64, upage: VirtualAddress) -> Option<u64> {
    // SAFETY: see `install_page`.
    let entry = unsafe { walk(root, upage, false) }?;
    // SAFETY: see `install_page`.
    let entry = unsafe { &mut *entry };
    if !entry.is_present() {
        return None;
    }
    let frame = entry.frame()?;
    entry.clear();
    super::vmm::tlb::flush_address(upage);
    Some(phys_to_virt_addr(frame.as_u64() << 12) as u64)
}

/// Kernel virtual address currently mapped at `upage`, if any.
pub fn pagedir_get_page(root: u64, upage: VirtualAddress) -> Option<u64> {
    // SAFETY: see `install_page`.
    let entry = unsafe { walk(root, upage, false) }?;
    // SAFETY: see `install_page`.
    let entry = unsafe { &*entry };
    let frame = entry.frame()?;
    Some(phys_to_virt_addr(frame.as_u64() << 12) as u64)
}

pub fn pagedir_is_dirty(root: u64, upage: VirtualAddress) -> bool {
    // SAFETY: see `install_page`.
    match unsafe { walk(root, upage, false) } {
        Some(entry) => unsafe { &*entry }.flags().contains(PageFlags::DIRTY),
        None => false,
    }
}

pub fn pagedir_is_accessed(root: u64, upage: VirtualAddress) -> bool {
    // SAFETY: see `install_page`.
    match unsafe { walk(root, upage, false) } {
        Some(entry) => unsafe { &*entry }.flags().contains(PageFlags::ACCESSED),
        None => false,
    }
}

pub fn pagedir_set_dirty(root: u64, upage: VirtualAddress, value: bool) {
    // SAFETY: see `install_page`.
    if let Some(entry) = unsafe { walk(root, upage, false) } {
        // SAFETY: see `install_page`.
        let entry = unsafe { &mut *entry };
        if value {
            let frame = entry.frame();
            if let Some(frame) = frame {
                entry.set(frame, entry.flags() | PageFlags::DIRTY);
            }
        } else {
            entry.clear_flag(PageFlags::DIRTY);
        }
    }
}

pub fn pagedir_set_accessed(root: u64, upage: VirtualAddress, value: bool) {
    // SAFETY: see `install_page`.
    if let Some(entry) = unsafe { walk(root, upage, false) } {
        // SAFETY: see `install_page`.
        let entry = unsafe { &mut *entry };
        if value {
            let frame = entry.frame();
            if let Some(frame) = frame {
                entry.set(frame, entry.flags() | PageFlags::ACCESSED);
            }
        } else {
            entry.clear_flag(PageFlags::ACCESSED);
        }
    }
}
