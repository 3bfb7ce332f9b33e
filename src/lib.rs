//! Kernel scheduling and synchronization core.
//!
//! Owns the process table, the priority runqueue, the per-CPU
//! dispatcher, sleep/wakeup, and the semaphore/rwlock tables. Virtual
//! memory, trap/interrupt entry assembly, the file system, and console
//! I/O are external collaborators, reached only through [`hal`].
//!
//! Linked into a larger kernel image the way the teacher's own
//! `rustkernel` crate is linked against the untranslated C parts of
//! xv6-riscv: this crate supplies `rust_main`/the syscall surface as
//! its entry points and expects the rest of the image to supply
//! everything `hal` declares.
#![cfg_attr(not(test), no_std)]
#![allow(clippy::missing_safety_doc)]

pub mod hal;
pub mod intr;
pub mod klog;
pub mod param;
pub mod proc;
pub mod sync;
pub mod syscall;

use core::ptr::addr_of_mut;
use log::LevelFilter;
use proc::{cpu::Cpu, process::Process};

/// Brought up once, by CPU 0, before any CPU starts scheduling.
pub unsafe fn kernel_init() {
    klog::init(LevelFilter::Trace);
    log::info!("scheduling/synchronization core starting");
    Process::init_kernel_stacks();
    Process::user_init();
}

/// Brought up by every CPU, including CPU 0 after `kernel_init`
/// returns: install the idle slot and switch into its loop. Mirrors
/// the teacher's/`original_source`'s per-CPU `scheduler()` bootstrap —
/// a single one-time switch into the idle slot, which then drives
/// every later dispatch itself by re-entering `schedule()`. Never
/// returns.
pub unsafe fn kernel_start(hartid: i32) -> ! {
    let cpu = Cpu::current();
    cpu.init_idle(*b"idle\0\0\0\0\0\0\0\0\0\0\0\0");

    log::debug!("cpu {} entering dispatch loop", hartid);
    hal::swtch(addr_of_mut!(cpu.context), addr_of_mut!(cpu.idleproc.context));
    panic!("cpu {} scheduler returned", hartid);
}

#[cfg(not(test))]
#[panic_handler]
fn panic_handler(info: &core::panic::PanicInfo) -> ! {
    log::error!("{}", info);
    loop {
        core::hint::spin_loop();
    }
}
