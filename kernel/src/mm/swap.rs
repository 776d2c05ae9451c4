//! Disk-backed swap store.
//!
//! Slots are fixed at one page (`PAGE_SIZE` bytes, `SECTORS_PER_PAGE` device
//! blocks) each. A bitmap tracks occupancy (`true` = in use); slot lifetime
//! is owned entirely by the single [`SptEntry`](super::spt::SptEntry) that
//! swapped a frame out, so there is no reference counting.
//!
//! Acquired after `frame_table_lock`, before any file lock, per the lock
//! order documented on [`super::frame_table`].

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;

use spin::Mutex;

use crate::error::{KernelError, KernelResult};
use crate::fs::blockdev::BlockDevice;

use super::{PAGE_SIZE, SECTORS_PER_PAGE};

struct SwapStore {
    device: Box<dyn BlockDevice>,
    occupied: Vec<u64>,
    slot_count: usize,
}

impl SwapStore {
    fn slot_free(&self, slot: usize) -> bool {
        let word = slot / 64;
        let bit = slot % 64;
        self.occupied[word] & (1 << bit) == 0
    }

    fn mark(&mut self, slot: usize, used: bool) {
        let word = slot / 64;
        let bit = slot % 64;
        if used {
            self.occupied[word] |= 1 << bit;
        } else {
            self.occupied[word] &= !(1 << bit);
        }
    }

    fn find_free_slot(&self) -> Option<usize> {
        (0..self.slot_count).find(|&slot| self.slot_free(slot))
    }
}

static SWAP: Mutex<Option<SwapStore>> = Mutex::new(None);

/// Called during `mm::init` before any device has been registered. The
/// store remains `None` (swap unavailable) until [`attach`] runs.
pub fn init_uninitialized() {
    log::debug!("[swap] deferred until device attach");
}

/// Attach the backing block device, sizing the slot bitmap to the device's
/// capacity. Must run once, after the device driver owning `device` has
/// probed its hardware.
pub fn attach(device: Box<dyn BlockDevice>) {
    let bytes = device.block_size() as u64 * device.block_count();
    let slot_count = (bytes / PAGE_SIZE as u64) as usize;
    let words = slot_count.div_ceil(64).max(1);
    let mut guard = SWAP.lock();
    log::info!(
        "[swap] attached {} ({} slots)",
        device.name(),
        slot_count
    );
    *guard = Some(SwapStore {
        device,
        occupied: alloc::vec![0u64; words],
        slot_count,
    });
}

/// Write the page at `frame_kaddr` to a free swap slot, returning its index.
pub fn swap_out(frame_kaddr: u64) -> KernelResult<usize> {
    let mut guard = SWAP.lock();
    let store = guard.as_mut().ok_or(KernelError::NotInitialized {
        subsystem: "swap",
    })?;

    let slot = store
        .find_free_slot()
        .ok_or(KernelError::ResourceExhausted { resource: "swap" })?;

    // SAFETY: `frame_kaddr` names a live, page-sized, exclusively-owned
    // frame; the caller (frame table eviction) holds the frame table lock
    // for the duration of the call.
    let bytes = unsafe { core::slice::from_raw_parts(frame_kaddr as *const u8, PAGE_SIZE) };

    let start_block = (slot * SECTORS_PER_PAGE) as u64;
    store
        .device
        .write_blocks(start_block, bytes)
        .map_err(|_| KernelError::ResourceExhausted { resource: "swap" })?;
    store.mark(slot, true);
    Ok(slot)
}

/// Read slot `slot` back into the page at `frame_kaddr` and free the slot.
pub fn swap_in(slot: usize, frame_kaddr: u64) -> KernelResult<()> {
    let mut guard = SWAP.lock();
    let store = guard.as_mut().ok_or(KernelError::NotInitialized {
        subsystem: "swap",
    })?;

    // SAFETY: `frame_kaddr` names a freshly allocated, page-sized frame not
    // yet visible to any other mapping.
    let bytes = unsafe { core::slice::from_raw_parts_mut(frame_kaddr as *mut u8, PAGE_SIZE) };

    let start_block = (slot * SECTORS_PER_PAGE) as u64;
    store
        .device
        .read_blocks(start_block, bytes)
        .map_err(|_| KernelError::HardwareError {
            device: "swap",
            code: 0,
        })?;
    store.mark(slot, false);
    Ok(())
}

/// Release a slot's storage without reading it back (used when a CODE page
/// holding swapped data is destroyed rather than faulted back in).
pub fn free_slot(slot: usize) {
    if let Some(store) = SWAP.lock().as_mut() {
        store.mark(slot, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::blockdev::RamBlockDevice;
    use alloc::string::String;

    fn attach_ramdisk(pages: u64) {
        let sectors_per_page = SECTORS_PER_PAGE as u64;
        let dev = RamBlockDevice::new(String::from("swap0"), 512, pages * sectors_per_page);
        attach(Box::new(dev));
    }

    #[test]
    fn swap_out_then_in_round_trips() {
        attach_ramdisk(4);

        let mut page = alloc::vec![0u8; PAGE_SIZE];
        page[0] = 0xAB;
        page[PAGE_SIZE - 1] = 0xCD;
        let kaddr = page.as_mut_ptr() as u64;

        let slot = swap_out(kaddr).expect("swap_out");

        let mut back = alloc::vec![0u8; PAGE_SIZE];
        swap_in(slot, back.as_mut_ptr() as u64).expect("swap_in");
        assert_eq!(back[0], 0xAB);
        assert_eq!(back[PAGE_SIZE - 1], 0xCD);
    }

    #[test]
    fn exhausted_store_reports_resource_exhausted() {
        attach_ramdisk(1);
        let page = alloc::vec![0u8; PAGE_SIZE];
        let first = swap_out(page.as_ptr() as u64).expect("first swap_out");
        let second = swap_out(page.as_ptr() as u64);
        assert!(second.is_err());
        free_slot(first);
    }
}
