//! Page fault dispatch.
//!
//! Architecture-specific trap handlers construct a [`PageFaultInfo`] from
//! their trap frame and delegate to [`handle_page_fault`], which routes the
//! fault through the same validation path used for syscall pointer checks:
//! a resolvable fault is either an SPT entry waiting to be materialized, or
//! a candidate for stack growth. Anything else is a genuine segfault.

#![allow(dead_code)]

use crate::error::KernelError;
use crate::mm::{user_validation, VirtualAddress};

/// Reason a page fault occurred, as decoded from the architecture trap
/// frame. Used only for diagnostics; the resolution path is the same for
/// every reason except the ones that are never resolvable (protection
/// violations, no-execute violations on a present page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFaultReason {
    /// Page is not present in the page table.
    NotPresent,
    /// A protection violation was detected (e.g., access rights mismatch).
    ProtectionViolation,
    /// Write to a read-only page.
    WriteToReadOnly,
    /// Attempt to execute a page marked as no-execute.
    ExecuteNoExecute,
    /// User-mode code tried to access a kernel-only page.
    UserModeKernelAccess,
}

/// Information about a page fault collected by the architecture trap handler.
#[derive(Debug, Clone, Copy)]
pub struct PageFaultInfo {
    /// The virtual address that caused the fault.
    pub faulting_address: u64,
    /// Why the fault occurred.
    pub reason: PageFaultReason,
    /// Whether the access was a write (true) or read (false).
    pub was_write: bool,
    /// Whether the fault occurred while executing in user mode.
    pub was_user_mode: bool,
    /// Instruction pointer at the time of the fault.
    pub instruction_pointer: u64,
}

/// Resolve a page fault, or signal the faulting process if it cannot be.
///
/// A kernel-mode fault (`!was_user_mode`) is never resolvable here; it is an
/// internal bug and the caller should panic. A protection violation on an
/// already-present page (write to read-only, NX violation) is never demand
/// paging or stack growth, and is reported immediately.
pub fn handle_page_fault(info: PageFaultInfo) -> Result<(), KernelError> {
    if !info.was_user_mode {
        return Err(KernelError::InvalidAddress {
            addr: info.faulting_address as usize,
        });
    }

    if matches!(
        info.reason,
        PageFaultReason::ProtectionViolation
            | PageFaultReason::WriteToReadOnly
            | PageFaultReason::ExecuteNoExecute
            | PageFaultReason::UserModeKernelAccess
    ) {
        return signal_segv(&info);
    }

    let process = crate::process::current_process().ok_or(KernelError::NotInitialized {
        subsystem: "process",
    })?;
    let esp = crate::process::current_thread()
        .map(|t| t.sp.load(core::sync::atomic::Ordering::Acquire) as u64)
        .unwrap_or(info.faulting_address);

    let result = user_validation::validate(
        process,
        esp,
        VirtualAddress::new(info.faulting_address).as_u64(),
        1,
    );

    match result {
        Ok(()) => {
            // The fault handler pins the page only transiently; the
            // instruction that faulted re-executes and accesses it without
            // kernel involvement once the mapping exists.
            user_validation::unpin_buffer(process, info.faulting_address, 1);
            Ok(())
        }
        Err(_) => signal_segv(&info),
    }
}

/// Deliver SIGSEGV to the faulting process.
fn signal_segv(info: &PageFaultInfo) -> Result<(), KernelError> {
    if let Some(process) = crate::process::current_process() {
        use crate::process::exit::signals::SIGSEGV;
        let _ = crate::process::exit::kill_process(process.pid, SIGSEGV);
    }

    Err(KernelError::InvalidAddress {
        addr: info.faulting_address as usize,
    })
}

// ---------------------------------------------------------------------------
// Architecture-specific entry points
// ---------------------------------------------------------------------------

/// Build a [`PageFaultInfo`] from an x86_64 page fault error code and CR2.
///
/// Error code bits (from Intel SDM):
/// - Bit 0 (P):    0 = not-present, 1 = protection violation
/// - Bit 1 (W/R):  0 = read, 1 = write
/// - Bit 2 (U/S):  0 = supervisor, 1 = user
/// - Bit 4 (I/D):  1 = instruction fetch
#[cfg(target_arch = "x86_64")]
pub fn from_x86_64(error_code: u64, cr2: u64, rip: u64) -> PageFaultInfo {
    let not_present = (error_code & 1) == 0;
    let was_write = (error_code & 2) != 0;
    let was_user = (error_code & 4) != 0;
    let was_fetch = (error_code & 16) != 0;

    let reason = if not_present {
        PageFaultReason::NotPresent
    } else if was_fetch {
        PageFaultReason::ExecuteNoExecute
    } else if was_write {
        PageFaultReason::WriteToReadOnly
    } else if was_user {
        PageFaultReason::UserModeKernelAccess
    } else {
        PageFaultReason::ProtectionViolation
    };

    PageFaultInfo {
        faulting_address: cr2,
        reason,
        was_write,
        was_user_mode: was_user,
        instruction_pointer: rip,
    }
}

/// Build a [`PageFaultInfo`] from an AArch64 data/instruction abort.
///
/// `esr_el1` contains the ESR value and `far_el1` the faulting address.
/// ISS encoding for Data Abort (EC=0b100100/0b100101):
/// - Bit 6 (WnR): 0 = read, 1 = write
/// - Bits [5:0] (DFSC): fault status code
#[cfg(target_arch = "aarch64")]
pub fn from_aarch64(esr_el1: u64, far_el1: u64, elr_el1: u64) -> PageFaultInfo {
    let dfsc = (esr_el1 & 0x3F) as u8;
    let was_write = (esr_el1 & (1 << 6)) != 0;
    // EC field is bits [31:26]
    let ec = ((esr_el1 >> 26) & 0x3F) as u8;
    // If EC == 0b100100 the abort came from a lower EL (user mode)
    let was_user = ec == 0b100100;

    let reason = match dfsc & 0x0F {
        // Translation faults (levels 0-3)
        0x04..=0x07 => PageFaultReason::NotPresent,
        // Permission faults (levels 0-3)
        0x0C..=0x0F => {
            if was_write {
                PageFaultReason::WriteToReadOnly
            } else {
                PageFaultReason::ProtectionViolation
            }
        }
        _ => PageFaultReason::ProtectionViolation,
    };

    PageFaultInfo {
        faulting_address: far_el1,
        reason,
        was_write,
        was_user_mode: was_user,
        instruction_pointer: elr_el1,
    }
}

/// Build a [`PageFaultInfo`] from a RISC-V page fault trap.
///
/// RISC-V uses different exception codes for load, store, and instruction
/// page faults (causes 12, 13, 15 respectively).
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub fn from_riscv(cause: u64, stval: u64, sepc: u64) -> PageFaultInfo {
    let was_write = cause == 15; // Store/AMO page fault
    let was_fetch = cause == 12; // Instruction page fault
                                 // cause == 13 is load page fault

    // RISC-V does not encode present vs. permission in the cause alone;
    // the PTE must be inspected. Default to NotPresent and let the handler
    // check SPT state.
    let reason = if was_fetch {
        PageFaultReason::ExecuteNoExecute
    } else {
        PageFaultReason::NotPresent
    };

    // User-mode faults come from U-mode; the SPP bit of sstatus indicates
    // whether the previous privilege was S-mode. We conservatively mark all
    // page faults as user-mode here; the caller can refine using sstatus.
    PageFaultInfo {
        faulting_address: stval,
        reason,
        was_write,
        was_user_mode: true,
        instruction_pointer: sepc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_fault_reason_equality() {
        assert_eq!(PageFaultReason::NotPresent, PageFaultReason::NotPresent);
        assert_ne!(
            PageFaultReason::NotPresent,
            PageFaultReason::WriteToReadOnly
        );
    }

    #[test]
    fn test_page_fault_info_construction() {
        let info = PageFaultInfo {
            faulting_address: 0xDEAD_BEEF,
            reason: PageFaultReason::NotPresent,
            was_write: false,
            was_user_mode: true,
            instruction_pointer: 0x4010_0000,
        };
        assert_eq!(info.faulting_address, 0xDEAD_BEEF);
        assert!(!info.was_write);
        assert!(info.was_user_mode);
    }

    #[test]
    fn test_kernel_mode_fault_is_never_resolved_here() {
        let info = PageFaultInfo {
            faulting_address: 0xFFFF_8000_0000_1000,
            reason: PageFaultReason::ProtectionViolation,
            was_write: false,
            was_user_mode: false,
            instruction_pointer: 0xFFFF_8000_0010_0000,
        };
        assert!(handle_page_fault(info).is_err());
    }
}
