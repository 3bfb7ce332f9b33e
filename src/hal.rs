//! Hardware/platform interfaces this crate consumes but does not implement.
//!
//! The scheduling and synchronization core owns the process table, the
//! runqueue, and the sleep/wakeup mechanism. It does not own virtual
//! memory, the physical allocator, trap/interrupt entry assembly, the
//! file system, or console I/O — `spec.md` §1 calls these out as
//! external collaborators, referenced only through the interfaces
//! listed here. They are declared `extern "C"` exactly as the teacher
//! declares `kalloc`, `swtch`, and friends in `proc.rs`/`riscv.rs`: this
//! crate is one translation unit of a larger kernel, not a standalone
//! bootable image.

use crate::proc::context::Context;
use core::ffi::c_void;

pub type Pagetable = *mut u64;

extern "C" {
    /// Allocate one physical page, or null on exhaustion.
    pub fn kalloc() -> *mut u8;
    /// Free a page previously returned by `kalloc`.
    pub fn kfree(ptr: *mut u8);

    /// Enable/disable/query this hart's interrupt-enable bit.
    pub fn intr_on();
    pub fn intr_off();
    pub fn intr_get() -> i32;

    /// Return this hart's id. Interrupts must be disabled by the caller.
    pub fn cpuid() -> i32;

    /// Save the caller's registers into `from`, restore `to`'s, and jump.
    /// The classic xv6 `swtch(struct context *, struct context *)`.
    pub fn swtch(from: *mut Context, to: *mut Context);

    /// Copy `len` bytes from kernel memory at `src` into `pagetable` at
    /// user virtual address `dst_va`. Returns 0 on success, -1 on a
    /// faulting user address.
    pub fn copyout(pagetable: Pagetable, dst_va: u64, src: *const u8, len: u64) -> i32;

    /// Monotonic timer-tick counter maintained by the trap subsystem.
    pub fn uptime_ticks() -> u32;

    /// Write kernel log/console text. No locking is implied; callers
    /// (the `klog` logger) serialize their own calls.
    pub fn console_write(bytes: *const u8, len: usize);

    /// Build/tear down a fresh user page table with the trampoline and
    /// trapframe mapped in. Owned by the (external) virtual memory layer.
    pub fn proc_pagetable(trapframe: *mut u8) -> Pagetable;
    pub fn proc_freepagetable(pagetable: Pagetable, size: u64);
    pub fn uvmcopy(old: Pagetable, new: Pagetable, size: u64) -> i32;

    /// File-descriptor table lifecycle, owned by the (external) file system.
    pub fn fileclose(file: *mut c_void);
    pub fn filedup(file: *mut c_void) -> *mut c_void;
    pub fn idup(inode: *mut c_void) -> *mut c_void;
    pub fn iput(inode: *mut c_void);
    /// Begin/end a filesystem operation bracket (xv6's `begin_op`/`end_op`).
    pub fn fs_begin_op();
    pub fn fs_end_op();

    /// Return a freshly allocated slot's first instruction to user
    /// space. Owned by the (external) trap/return-path assembly;
    /// `forkret` hands off here once `schedule()` has dispatched the
    /// slot for the first time.
    pub fn usertrap_ret() -> !;

    /// Fixed, pre-mapped virtual address of process-table slot
    /// `index`'s kernel stack page (a guard page sits immediately
    /// above it). Owned by the external virtual-memory layer's memory
    /// layout, the `proc_mapstacks`-equivalent mapping into the kernel
    /// page table having already run before `kernel_init` does.
    pub fn kstack_va(index: usize) -> u64;
}
