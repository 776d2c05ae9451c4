//! Memory management system calls
//!
//! Provides syscall implementations for virtual memory operations:
//! - `sys_mmap` (20): Map memory (anonymous or file-backed)
//! - `sys_munmap` (21): Unmap a memory region
//! - `sys_mprotect` (22): Change page protection flags

#[cfg(feature = "alloc")]
extern crate alloc;

use super::{SyscallError, SyscallResult};
use crate::{
    mm::{vas::MappingType, VirtualAddress},
    process,
};

/// Highest address considered user space on a 64-bit canonical address
/// space; `munmap`/`mprotect` reject ranges that touch or cross into the
/// kernel half rather than materializing anything through the SPT.
const USER_SPACE_LIMIT: usize = 0x0000_8000_0000_0000;

/// Bounds-only check for syscall arguments that manipulate an existing
/// mapping rather than dereference it: non-null, non-overflowing, and
/// entirely below [`USER_SPACE_LIMIT`].
fn validate_user_pointer(addr: usize, length: usize) -> SyscallResult<()> {
    if addr == 0 {
        return Err(SyscallError::InvalidArgument);
    }
    let end = addr.checked_add(length).ok_or(SyscallError::InvalidArgument)?;
    if end > USER_SPACE_LIMIT {
        return Err(SyscallError::InvalidArgument);
    }
    Ok(())
}

// ============================================================================
// Memory protection flags (matching POSIX mmap/mprotect)
// ============================================================================

/// No access allowed.
pub const PROT_NONE: usize = 0x0;
/// Pages may be read.
pub const PROT_READ: usize = 0x1;
/// Pages may be written.
pub const PROT_WRITE: usize = 0x2;
/// Pages may be executed.
pub const PROT_EXEC: usize = 0x4;

// ============================================================================
// Mapping flags
// ============================================================================

/// Share changes with other mappings of the same region.
pub const MAP_SHARED: usize = 0x01;
/// Create a private copy-on-write mapping.
pub const MAP_PRIVATE: usize = 0x02;
/// Place the mapping at exactly the specified address.
pub const MAP_FIXED: usize = 0x10;
/// The mapping is not backed by any file (zero-filled).
pub const MAP_ANONYMOUS: usize = 0x20;

/// Sentinel value indicating a failed mapping.
pub const MAP_FAILED: usize = usize::MAX;

// ============================================================================
// Helper: convert PROT_* flags to a MappingType
// ============================================================================

/// Choose the VAS MappingType that best matches the given protection flags.
fn prot_to_mapping_type(prot: usize, shared: bool) -> MappingType {
    if shared {
        return MappingType::Shared;
    }
    if prot & PROT_EXEC != 0 {
        MappingType::Code
    } else {
        // Data covers read-only and read-write private mappings
        MappingType::Data
    }
}

// ============================================================================
// Syscall implementations
// ============================================================================

/// Map memory into the process address space (syscall 20).
///
/// Allocates physical frames, creates page table entries in the process's
/// VAS, and returns the virtual address of the new mapping.
///
/// # Arguments
/// - `addr`: Preferred address (hint, or exact if MAP_FIXED). 0 for kernel
///   choice.
/// - `length`: Size of the mapping in bytes (rounded up to page size).
/// - `prot`: Protection flags (PROT_READ | PROT_WRITE | PROT_EXEC).
/// - `flags`: Mapping flags (MAP_SHARED | MAP_PRIVATE | MAP_ANONYMOUS |
///   MAP_FIXED).
/// - `fd_offset`: Packed fd (upper 32 bits) and offset (lower 32 bits) for
///   file-backed mappings. Ignored for MAP_ANONYMOUS.
///
/// # Returns
/// Address of the new mapping on success.
pub fn sys_mmap(
    addr: usize,
    length: usize,
    prot: usize,
    flags: usize,
    fd_offset: usize,
) -> SyscallResult {
    // Validate length
    if length == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    // Validate protection flags (only low 3 bits valid)
    if prot & !(PROT_READ | PROT_WRITE | PROT_EXEC) != 0 {
        return Err(SyscallError::InvalidArgument);
    }

    // Enforce W^X: writable + executable is not allowed
    if prot & PROT_WRITE != 0 && prot & PROT_EXEC != 0 {
        return Err(SyscallError::PermissionDenied);
    }

    // Must specify either SHARED or PRIVATE (not both, not neither)
    let shared = flags & MAP_SHARED != 0;
    let private = flags & MAP_PRIVATE != 0;
    if shared == private {
        return Err(SyscallError::InvalidArgument);
    }

    // MAP_FIXED requires a valid non-null, page-aligned address
    let is_fixed = flags & MAP_FIXED != 0;
    if is_fixed && (addr == 0 || addr & 0xFFF != 0) {
        return Err(SyscallError::InvalidArgument);
    }

    let proc = process::current_process().ok_or(SyscallError::InvalidState)?;

    let is_anonymous = flags & MAP_ANONYMOUS != 0;
    let fd = if !is_anonymous { fd_offset >> 32 } else { 0 };
    let offset = if !is_anonymous {
        fd_offset & 0xFFFF_FFFF
    } else {
        0
    };

    let mapping_type = prot_to_mapping_type(prot, shared);
    let memory_space = proc.memory_space.lock();

    // File-backed mappings are registered as lazy MMAP entries in the
    // supplemental page table: no frame is touched here, and no bytes are
    // read until a page fault materializes each page on first access.
    let mapped_addr = if !is_anonymous {
        let file = {
            let file_table = proc.file_table.lock();
            file_table.get(fd).ok_or(SyscallError::InvalidArgument)?
        };

        let vaddr = if is_fixed {
            memory_space
                .reserve_region(VirtualAddress(addr as u64), length, mapping_type)
                .map_err(|_| SyscallError::OutOfMemory)?;
            VirtualAddress(addr as u64)
        } else {
            memory_space
                .reserve_mmap(length, mapping_type)
                .map_err(|_| SyscallError::OutOfMemory)?
        };

        let mut spt = proc.spt.lock();
        if spt
            .create_mmap_region_at(file, offset as u64, length, vaddr)
            .is_none()
        {
            return Err(SyscallError::InvalidArgument);
        }
        vaddr.as_usize()
    } else if is_fixed {
        // MAP_FIXED anonymous: map at the exact requested address
        memory_space
            .map_region(VirtualAddress(addr as u64), length, mapping_type)
            .map_err(|_| SyscallError::OutOfMemory)?;
        addr
    } else {
        // Kernel-chosen address: use VAS.mmap() which bumps next_mmap_addr
        let vaddr = memory_space
            .mmap(length, mapping_type)
            .map_err(|_| SyscallError::OutOfMemory)?;
        vaddr.as_usize()
    };

    // Diagnostic: trace all mmap calls
    #[cfg(target_arch = "x86_64")]
    unsafe {
        crate::arch::x86_64::idt::raw_serial_str(b"[MMAP] addr=0x");
        crate::arch::x86_64::idt::raw_serial_hex(mapped_addr as u64);
        crate::arch::x86_64::idt::raw_serial_str(b" len=0x");
        crate::arch::x86_64::idt::raw_serial_hex(length as u64);
        crate::arch::x86_64::idt::raw_serial_str(b" flags=0x");
        crate::arch::x86_64::idt::raw_serial_hex(flags as u64);
        if !is_anonymous {
            crate::arch::x86_64::idt::raw_serial_str(b" fd=");
            crate::arch::x86_64::idt::raw_serial_hex(fd as u64);
            crate::arch::x86_64::idt::raw_serial_str(b" off=0x");
            crate::arch::x86_64::idt::raw_serial_hex(offset as u64);
        } else {
            crate::arch::x86_64::idt::raw_serial_str(b" ANON");
        }
        crate::arch::x86_64::idt::raw_serial_str(b"\n");
    }

    Ok(mapped_addr)
}

/// Unmap a memory region (syscall 21).
///
/// For a region backed by a supplemental page table MMAP entry, tears it
/// down through `free_mmap_region`: dirty pages are written back to the
/// file before their frames are released. Everything else (eagerly-backed
/// anonymous mappings, heap, stack) is unmapped directly through the VAS.
///
/// # Arguments
/// - `addr`: Start address of the region to unmap (must be page-aligned).
/// - `length`: Length of the region in bytes.
///
/// # Returns
/// 0 on success.
pub fn sys_munmap(addr: usize, length: usize) -> SyscallResult {
    if addr == 0 || length == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    // Address must be page-aligned
    if addr & 0xFFF != 0 {
        return Err(SyscallError::InvalidArgument);
    }

    let proc = process::current_process().ok_or(SyscallError::InvalidState)?;

    // Validate the region is in user space
    validate_user_pointer(addr, length)?;

    let memory_space = proc.memory_space.lock();
    let page_table_root = memory_space.get_page_table();

    let first_entry = proc.spt.lock().find(VirtualAddress(addr as u64));
    if let Some(handle) = first_entry {
        let is_mmap = matches!(handle.lock().kind, crate::mm::spt::SpteKind::Mmap);
        if is_mmap {
            proc.spt
                .lock()
                .free_mmap_region(&handle, page_table_root)
                .map_err(|_| SyscallError::InvalidArgument)?;
            let _ = memory_space.unmap(addr, length);
            return Ok(0);
        }
    }

    memory_space
        .unmap(addr, length)
        .map_err(|_| SyscallError::InvalidArgument)?;

    Ok(0)
}

/// Change memory protection on a region (syscall 22).
///
/// Validates the request and records the new protection. The VAS tracks
/// mapping flags; the actual PTE updates happen through the page mapper.
///
/// # Arguments
/// - `addr`: Start address (must be page-aligned).
/// - `length`: Length of the region in bytes.
/// - `prot`: New protection flags (PROT_READ | PROT_WRITE | PROT_EXEC).
///
/// # Returns
/// 0 on success.
pub fn sys_mprotect(addr: usize, length: usize, prot: usize) -> SyscallResult {
    if addr == 0 || length == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    // Address must be page-aligned
    if addr & 0xFFF != 0 {
        return Err(SyscallError::InvalidArgument);
    }

    // Validate protection flags
    if prot & !(PROT_READ | PROT_WRITE | PROT_EXEC) != 0 {
        return Err(SyscallError::InvalidArgument);
    }

    let proc = process::current_process().ok_or(SyscallError::InvalidState)?;

    // Validate the region is in user space
    validate_user_pointer(addr, length)?;

    // Check W^X violation
    if prot & PROT_WRITE != 0 && prot & PROT_EXEC != 0 {
        return Err(SyscallError::PermissionDenied);
    }

    // Verify the mapping exists in the process's address space
    let memory_space = proc.memory_space.lock();
    let _mapping = memory_space
        .find_mapping(VirtualAddress(addr as u64))
        .ok_or(SyscallError::InvalidArgument)?;

    // Update hardware page table entries
    memory_space
        .protect_region(VirtualAddress(addr as u64), length, prot)
        .map_err(|_| SyscallError::InvalidArgument)?;

    Ok(0)
}

/// Maximum user heap size: 512 MiB.
///
/// Prevents a single process from consuming all physical memory via brk().
/// cc1 (GCC compiler proper) typically uses 100-300 MiB for large source files;
/// 512 MiB provides comfortable headroom.
const MAX_USER_HEAP_SIZE: u64 = 512 * 1024 * 1024;

/// Set or query the program break (syscall 23).
///
/// If `addr` is 0, returns the current break. Otherwise, attempts to move
/// the break to `addr`, allocating or freeing pages as needed.
///
/// Follows Linux semantics: always returns the current break address.
/// On failure, the break is unchanged (so returned value != requested value).
/// The libc sbrk() detects failure by comparing the return to the request.
///
/// # Arguments
/// - `addr`: New break address, or 0 to query.
///
/// # Returns
/// Current (or new) break address on success.
pub fn sys_brk(addr: usize) -> SyscallResult {
    let proc = process::current_process().ok_or(SyscallError::InvalidState)?;
    let memory_space = proc.memory_space.lock();

    let new_break = if addr == 0 {
        None
    } else {
        // Validate: reject requests that would exceed the max heap size.
        let heap_start = memory_space.heap_start_addr();
        let requested = addr as u64;
        if requested > heap_start + MAX_USER_HEAP_SIZE {
            // Return current break (unchanged) to signal failure.
            return Ok(memory_space.brk(None).as_usize());
        }

        // Page-align the request upward for efficiency.
        // The VAS brk() handles sub-page increments, but page-aligning here
        // avoids partial-page fragmentation in the page table.
        Some(VirtualAddress(addr as u64))
    };

    let result = memory_space.brk(new_break);

    Ok(result.as_usize())
}
