//! Per-CPU state (`spec.md` §3 "Per-CPU record").

use super::context::Context;
use super::process::{Process, ProcessState};
use super::scheduler;
use super::trapframe::TrapFrame;
use crate::hal;
use crate::param::{NCPU, PAGE_SIZE, PRIO_MAX};
use array_macro::array;
use core::ptr::{addr_of_mut, null_mut};

/// Per-CPU state.
pub struct Cpu {
    /// The slot currently running on this CPU, or null.
    pub proc: *mut Process,
    /// This CPU's idle slot: pid 0, `prio = PRIO_MAX`, never enqueued.
    /// `init_idle` brings it up once at boot; the dispatcher falls back
    /// to it whenever `runqueue::pick_next()` finds nothing runnable.
    pub idleproc: Process,
    /// `swtch()` target used to enter `schedule()`.
    pub context: Context,
    /// Depth of `push_off()` nesting.
    pub noff: i32,
    /// Were interrupts enabled before the first `push_off()`?
    pub intena: bool,
    /// Raised by the tick hook when a higher-or-equal priority slot
    /// becomes runnable; consumed at the next trap-return boundary.
    pub preempt_pending: bool,
}
impl Cpu {
    const fn new() -> Cpu {
        Cpu {
            proc: null_mut(),
            idleproc: Process::new(),
            context: Context::new(),
            noff: 0,
            intena: false,
            preempt_pending: false,
        }
    }

    /// # Safety
    /// Interrupts must be disabled by the caller: the id this resolves
    /// to would otherwise be stale the instant a process migrates.
    pub unsafe fn current() -> &'static mut Cpu {
        let id = hal::cpuid();
        &mut CPUS[id as usize]
    }

    /// Bring this CPU's idle slot up: allocate its trapframe, page
    /// table and kernel stack exactly as for any other slot, and prime
    /// its saved context to resume in `scheduler::idle_main` with the
    /// stack pointer at the top of that page (`spec.md` §4.C "idle
    /// slot"). Called once per CPU at boot.
    ///
    /// # Safety
    /// Must be called before this CPU's dispatch loop starts.
    pub unsafe fn init_idle(&mut self, name: [u8; 16]) {
        {
            let p = &mut self.idleproc;
            p.pid = 0;
            p.base_prio = PRIO_MAX;
            p.prio = PRIO_MAX;
            p.name = name;

            p.trapframe = hal::kalloc() as *mut TrapFrame;
            if p.trapframe.is_null() {
                panic!("init_idle: out of memory for trapframe");
            }
            p.pagetable = hal::proc_pagetable(p.trapframe as *mut u8);
            if p.pagetable.is_null() {
                panic!("init_idle: out of memory for pagetable");
            }
            p.kernel_stack = hal::kalloc() as u64;
            if p.kernel_stack == 0 {
                panic!("init_idle: out of memory for kernel stack");
            }

            p.context = Context::new();
            p.context.ra = scheduler::idle_main as usize as u64;
            p.context.sp = p.kernel_stack + PAGE_SIZE;

            p.state = ProcessState::Running;
        }
        self.proc = addr_of_mut!(self.idleproc);
    }
}

pub static mut CPUS: [Cpu; NCPU] = array![_ => Cpu::new(); NCPU];
