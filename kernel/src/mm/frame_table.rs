//! System-wide frame table: owns resident user frames, attributes them to
//! their current tenant SPT entry, and drives eviction when the physical
//! pool is exhausted.

extern crate alloc;

use alloc::vec::Vec;

use spin::Mutex;

use crate::error::{KernelError, KernelResult};
use crate::process::pcb::ProcessId;

use super::spt::SpteHandle;
use super::{alloc_user_frame, eviction, free_user_frame, pagedir};

/// One resident user frame and the SPT entry it currently backs.
pub struct FrameTableEntry {
    pub frame_kaddr: u64,
    pub owner: ProcessId,
    pub page_table_root: u64,
    pub spte: SpteHandle,
}

struct FrameTableInner {
    entries: Vec<FrameTableEntry>,
}

/// The single system-wide frame table. Its lock is `frame_table_lock` in
/// the host specification: held for the entirety of eviction, and acquired
/// before the swap lock or any file lock (never the reverse).
static FRAME_TABLE: Mutex<FrameTableInner> = Mutex::new(FrameTableInner {
    entries: Vec::new(),
});

pub fn init() {
    log::debug!("[frame_table] initialized");
}

/// `frame_alloc_for`: obtain a user-pool frame for `spte`, evicting a victim
/// if the pool is exhausted. Registers the new frame in the table before
/// returning it.
pub fn frame_alloc_for(
    owner: ProcessId,
    page_table_root: u64,
    spte: SpteHandle,
    zeroed: bool,
) -> KernelResult<u64> {
    let mut table = FRAME_TABLE.lock();

    loop {
        if let Some(frame_kaddr) = alloc_user_frame(zeroed) {
            table.entries.push(FrameTableEntry {
                frame_kaddr,
                owner,
                page_table_root,
                spte: spte.clone(),
            });
            return Ok(frame_kaddr);
        }

        let victim = eviction::select_victim(&table.entries).ok_or_else(|| {
            log::error!("[frame_table] no evictable frame: every resident frame is pinned");
            KernelError::ResourceExhausted {
                resource: "user frame pool (all frames pinned)",
            }
        })?;

        evict(&mut table, victim)?;
    }
}

/// `free_frame`: remove the entry for `frame_kaddr` and return it to the
/// allocator. The caller is responsible for having already cleared the MMU
/// mapping.
pub fn free_frame(frame_kaddr: u64) {
    let mut table = FRAME_TABLE.lock();
    if let Some(pos) = table
        .entries
        .iter()
        .position(|e| e.frame_kaddr == frame_kaddr)
    {
        table.entries.remove(pos);
    }
    free_user_frame(frame_kaddr);
}

/// Evict the frame at `index`, writing it back or swapping it out according
/// to its SPT entry's kind, then clear the MMU mapping and return the frame
/// to the pool.
fn evict(table: &mut FrameTableInner, index: usize) -> KernelResult<()> {
    use super::spt::SpteKind;

    let entry = table.entries.remove(index);
    let upage = entry.spte.lock().upage;

    let mut spte = entry.spte.lock();
    match spte.kind {
        SpteKind::Mmap => {
            if pagedir::pagedir_is_dirty(entry.page_table_root, upage) {
                let file = spte.file.clone().ok_or(KernelError::InvalidArgument {
                    name: "mmap_victim",
                    value: "mmap entry has no backing file",
                })?;
                // SAFETY: the frame is still mapped and owned exclusively by
                // this entry; we hold the frame table lock so no other
                // thread can evict or free it concurrently.
                let bytes = unsafe {
                    core::slice::from_raw_parts(
                        entry.frame_kaddr as *const u8,
                        spte.page_read_bytes,
                    )
                };
                if let Err(e) = file.write_at(spte.ofs as usize, bytes) {
                    log::error!("[eviction] mmap write-back failed: {e:?}");
                    panic!("fatal: mmap write-back failure during eviction");
                }
            }
            spte.frame = None;
        }
        SpteKind::File => {
            // Promote to CODE: the page was writable data made dirty.
            spte.kind = SpteKind::Code;
            swap_out_locked(&mut spte, &entry)?;
        }
        SpteKind::Code => {
            swap_out_locked(&mut spte, &entry)?;
        }
    }
    drop(spte);

    pagedir::pagedir_clear_page(entry.page_table_root, upage);
    free_user_frame(entry.frame_kaddr);
    Ok(())
}

fn swap_out_locked(
    spte: &mut spin::MutexGuard<'_, super::spt::SptEntry>,
    entry: &FrameTableEntry,
) -> KernelResult<()> {
    match super::swap::swap_out(entry.frame_kaddr) {
        Ok(slot) => {
            spte.in_swap = true;
            spte.swap_idx = Some(slot);
            spte.frame = None;
            Ok(())
        }
        Err(e) => {
            log::error!("[eviction] swap-out failed: {e:?}");
            panic!("fatal: no free swap slot during eviction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_frame_on_empty_table_is_noop() {
        // Exercises the "not found" path without touching the global
        // allocator singleton (no frame was ever registered).
        free_frame(0xdead_beef_0000);
    }
}
