//! User pointer validation and pinning.
//!
//! Syscall argument buffers and page-fault addresses are validated one page
//! at a time against the current process's supplemental page table. A page
//! that validates successfully is pinned for the duration of the kernel's
//! use of it, guaranteeing the eviction policy will not steal it out from
//! under an in-progress copy.

use crate::error::{KernelError, KernelResult};
use crate::process::pcb::Process;

use super::{spt, VirtualAddress, MAX_STACK_SIZE, PAGE_SIZE, STACK_HEURISTIC};

/// Validate and pin every page spanning `[ptr, ptr + size)` in `process`'s
/// address space. `esp` is the current user stack pointer, used to decide
/// whether an unmapped page below it is a legitimate stack-growth request.
///
/// On success every touched page has `pinned = true` and a resident frame.
/// On failure, already-pinned pages from this call are left pinned; callers
/// that abandon the syscall must still route to `unpin_buffer` for a
/// partially-validated range before propagating the error (process
/// termination does this implicitly via `spt::destroy`).
pub fn validate(process: &Process, esp: u64, ptr: u64, size: usize) -> KernelResult<()> {
    if size == 0 {
        return Ok(());
    }
    let root = process.memory_space.lock().get_page_table();
    let first_page = ptr & !(PAGE_SIZE as u64 - 1);
    let last_byte = ptr
        .checked_add(size as u64 - 1)
        .ok_or(KernelError::InvalidAddress { addr: ptr as usize })?;
    let last_page = last_byte & !(PAGE_SIZE as u64 - 1);

    let mut page = first_page;
    loop {
        validate_page(process, root, esp, page)?;
        if page == last_page {
            break;
        }
        page += PAGE_SIZE as u64;
    }
    Ok(())
}

fn validate_page(process: &Process, root: u64, esp: u64, page: u64) -> KernelResult<()> {
    let upage = VirtualAddress::new(page);
    let handle = {
        let mut table = process.spt.lock();
        table.find(upage)
    };

    if let Some(handle) = handle {
        handle.lock().pinned = true;
        let resident = handle.lock().resident();
        if !resident {
            spt::install_load_page(&handle, process.pid, root).map_err(|e| {
                handle.lock().pinned = false;
                e
            })?;
        }
        return Ok(());
    }

    if super::pagedir::pagedir_get_page(root, upage).is_some() {
        // Every resident page has an SPT entry by construction; a bare MMU
        // hit with none is a bookkeeping bug, not a recoverable case.
        log::error!("[user_validation] resident page {:#x} has no SPT entry", page);
        return Err(KernelError::InvalidState {
            expected: "resident page has an SPT entry",
            actual: "none found",
        });
    }

    if !stack_grow(process, root, esp, upage) {
        return Err(KernelError::InvalidAddress {
            addr: page as usize,
        });
    }
    let handle = process.spt.lock().find(upage).ok_or(KernelError::InvalidState {
        expected: "stack_grow installed an SPT entry",
        actual: "none found",
    })?;
    handle.lock().pinned = true;
    Ok(())
}

/// Validate a NUL-terminated user string starting at `ptr`, one page at a
/// time, stopping as soon as a NUL byte is observed. Returns the string's
/// length (excluding the terminator).
pub fn validate_string(process: &Process, esp: u64, ptr: u64) -> KernelResult<usize> {
    let root = process.memory_space.lock().get_page_table();
    let mut len = 0usize;
    let mut page = ptr & !(PAGE_SIZE as u64 - 1);

    loop {
        validate_page(process, root, esp, page)?;
        let frame = super::pagedir::pagedir_get_page(root, VirtualAddress::new(page)).ok_or(
            KernelError::InvalidAddress { addr: page as usize },
        )?;

        let page_start = page.max(ptr);
        let offset_in_page = (page_start - page) as usize;
        // SAFETY: `frame` was just confirmed resident and pinned by
        // `validate_page`; reading up to PAGE_SIZE bytes from it is sound.
        let bytes = unsafe {
            core::slice::from_raw_parts((frame as usize + offset_in_page) as *const u8, PAGE_SIZE - offset_in_page)
        };
        match bytes.iter().position(|&b| b == 0) {
            Some(nul) => {
                len += nul;
                return Ok(len);
            }
            None => {
                len += bytes.len();
                page += PAGE_SIZE as u64;
            }
        }
    }
}

/// Clear `pinned` on every page spanning `[ptr, ptr + size)`.
pub fn unpin_buffer(process: &Process, ptr: u64, size: usize) {
    if size == 0 {
        return;
    }
    let first_page = ptr & !(PAGE_SIZE as u64 - 1);
    let last_page = (ptr + size as u64 - 1) & !(PAGE_SIZE as u64 - 1);
    let mut page = first_page;
    loop {
        if let Some(handle) = process.spt.lock().find(VirtualAddress::new(page)) {
            handle.lock().pinned = false;
        }
        if page == last_page {
            break;
        }
        page += PAGE_SIZE as u64;
    }
}

/// Clear `pinned` on the pages spanning a string validated by
/// [`validate_string`].
pub fn unpin_string(process: &Process, ptr: u64, len: usize) {
    unpin_buffer(process, ptr, len + 1);
}

/// Attempt to grow the stack to cover `uaddr`. Returns `true` if a new CODE
/// SPT entry was installed (or already existed for this page), `false` if
/// `uaddr` does not qualify as stack growth.
///
/// Qualifies iff `uaddr >= esp - STACK_HEURISTIC`, the page is not already
/// mapped, and growing would not exceed `MAX_STACK_SIZE` below the stack's
/// top.
pub fn stack_grow(process: &Process, root: u64, esp: u64, uaddr: VirtualAddress) -> bool {
    let addr = uaddr.as_u64();
    if addr + STACK_HEURISTIC < esp {
        return false;
    }

    let memory_space = process.memory_space.lock();
    let stack_top = memory_space.stack_top() as u64;
    drop(memory_space);

    if addr >= stack_top {
        return false;
    }
    if stack_top - addr > MAX_STACK_SIZE {
        log::warn!("[user_validation] stack growth to {:#x} exceeds MAX_STACK_SIZE", addr);
        return false;
    }

    if process.spt.lock().find(uaddr).is_some() {
        // Idempotent: a repeated fault on an already-grown page is not an
        // error, just a no-op.
        return true;
    }

    let handle = process.spt.lock().create_code(uaddr, true);
    match spt::install_load_page(&handle, process.pid, root) {
        Ok(()) => true,
        Err(e) => {
            log::error!("[user_validation] stack growth materialization failed: {e:?}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_heuristic_rejects_far_below_esp() {
        // addr + STACK_HEURISTIC < esp with a wide margin never qualifies.
        let esp = 0x8000_0000u64;
        let addr = 0x1000u64;
        assert!(addr + STACK_HEURISTIC < esp);
    }
}
