//! Per-process trapframe layout.
//!
//! Sits in a page by itself, mapped into the user page table just
//! below the trampoline page. The trampoline/uservec assembly
//! (external to this crate — trap entry/exit assembly is an explicit
//! non-goal collaborator, `spec.md` §1) reads and writes these fields
//! directly, so the layout is part of this crate's ABI surface even
//! though the assembly itself is not. Copied verbatim from the
//! teacher's `proc.rs`/`proc/trapframe.rs` layout.

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct TrapFrame {
    pub kernel_satp: u64,
    pub kernel_sp: u64,
    pub kernel_trap: u64,
    pub epc: u64,
    pub kernel_hartid: u64,
    pub ra: u64,
    pub sp: u64,
    pub gp: u64,
    pub tp: u64,
    pub t0: u64,
    pub t1: u64,
    pub t2: u64,
    pub s0: u64,
    pub s1: u64,
    pub a0: u64,
    pub a1: u64,
    pub a2: u64,
    pub a3: u64,
    pub a4: u64,
    pub a5: u64,
    pub a6: u64,
    pub a7: u64,
    pub s2: u64,
    pub s3: u64,
    pub s4: u64,
    pub s5: u64,
    pub s6: u64,
    pub s7: u64,
    pub s8: u64,
    pub s9: u64,
    pub s10: u64,
    pub s11: u64,
    pub t3: u64,
    pub t4: u64,
    pub t5: u64,
    pub t6: u64,
}
