//! Process table & lifecycle (`spec.md` §4.A).

use super::{
    context::Context,
    cpu::Cpu,
    runqueue,
    scheduler::{schedule, wakeup},
    trapframe::TrapFrame,
};
use crate::{
    hal::{self, Pagetable},
    intr::InterruptBlocker,
    param::{NOFILE, NPROC, PAGE_SIZE, PRIO_DEFAULT},
    sync::spinlock::Spinlock,
};
use array_macro::array;
use core::{
    ffi::c_void,
    ptr::{addr_of, addr_of_mut, null_mut},
    sync::atomic::{AtomicI32, Ordering},
};

/// Helps ensure that wakeups of `wait()`ing parents are not lost.
/// Must be acquired before any slot's `lock` (`spec.md` §5 rule 1/6).
pub static WAIT_LOCK: Spinlock = Spinlock::new();

static NEXT_PID: AtomicI32 = AtomicI32::new(1);

pub static mut PROC_TABLE: [Process; NPROC] = array![_ => Process::new(); NPROC];
/// The first user process (`/init`). Children whose parent exits are
/// reparented to it (`spec.md` §4.A `exit`).
pub static mut INITPROC: *mut Process = null_mut();

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ProcessState {
    #[default]
    Unused,
    Used,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessError {
    MaxProcesses,
    Allocation,
    NoChildren,
    Killed,
    PageError,
}

/// Per-process state.
pub struct Process {
    pub lock: Spinlock,

    // `lock` must be held when using these:
    pub state: ProcessState,
    /// Non-null iff `state == Sleeping`.
    pub chan: *mut c_void,
    /// Sticky once set (`spec.md` §3 invariant on `killed`).
    pub killed: bool,
    /// Exit status visible to a reaping parent once `state == Zombie`.
    pub exit_status: i32,
    pub pid: i32,
    /// [0, PRIO_MAX]; distinct from `prio` so a future nice()-style
    /// syscall has a fixed point to adjust relative to.
    pub base_prio: i32,
    /// [0, PRIO_MAX], 0 highest. Lowered by aging, never raised by it.
    pub prio: i32,
    /// Ticks spent on the runqueue since the last dispatch or aging step.
    pub wait_ticks: u32,
    /// Intrusive successor link inside a runqueue bucket. Valid only
    /// while `state == Runnable` and the slot is enqueued.
    pub rq_next: *mut Process,

    // `WAIT_LOCK` must be held when using this:
    pub parent: *mut Process,

    // Private to the process; `lock` need not be held.
    pub kernel_stack: u64,
    pub memory_allocated: u64,
    pub pagetable: Pagetable,
    pub trapframe: *mut TrapFrame,
    pub context: Context,
    pub open_files: [*mut c_void; NOFILE],
    pub cwd: *mut c_void,
    pub name: [u8; 16],
}
unsafe impl Sync for Process {}

impl Process {
    pub const fn new() -> Process {
        Process {
            lock: Spinlock::new(),
            state: ProcessState::Unused,
            chan: null_mut(),
            killed: false,
            exit_status: 0,
            pid: 0,
            base_prio: PRIO_DEFAULT,
            prio: PRIO_DEFAULT,
            wait_ticks: 0,
            rq_next: null_mut(),
            parent: null_mut(),
            kernel_stack: 0,
            memory_allocated: 0,
            pagetable: null_mut(),
            trapframe: null_mut(),
            context: Context::new(),
            open_files: [null_mut(); NOFILE],
            cwd: null_mut(),
            name: [0; 16],
        }
    }

    /// Return the process running on the current CPU, if any.
    pub fn current() -> Option<&'static mut Process> {
        let _blocker = InterruptBlocker::new();
        let p = unsafe { Cpu::current().proc };
        if p.is_null() {
            None
        } else {
            unsafe { Some(&mut *p) }
        }
    }

    pub fn is_current(&self) -> bool {
        let _blocker = InterruptBlocker::new();
        addr_of!(*self).cast_mut() == unsafe { Cpu::current().proc }
    }

    fn alloc_pid() -> i32 {
        NEXT_PID.fetch_add(1, Ordering::SeqCst)
    }

    /// Look in the process table for an `Unused` slot. If found,
    /// initialize it and return with `lock` held. If there are no free
    /// slots or a memory allocation fails, return an error
    /// (`spec.md` §4.A `allocate()`, §7 "Resource exhaustion").
    ///
    /// # Safety
    /// Caller must eventually release the returned slot's `lock`.
    pub unsafe fn alloc() -> Result<&'static mut Process, ProcessError> {
        let mut index: Option<usize> = None;
        for (i, p) in PROC_TABLE.iter().enumerate() {
            p.lock.lock_unguarded();
            if p.state == ProcessState::Unused {
                index = Some(i);
                break;
            } else {
                p.lock.unlock();
            }
        }
        let Some(index) = index else {
            return Err(ProcessError::MaxProcesses);
        };

        let p: &mut Process = &mut PROC_TABLE[index];
        p.pid = Process::alloc_pid();
        p.state = ProcessState::Used;
        p.base_prio = PRIO_DEFAULT;
        p.prio = PRIO_DEFAULT;
        p.wait_ticks = 0;

        p.trapframe = hal::kalloc() as *mut TrapFrame;
        if p.trapframe.is_null() {
            p.free();
            p.lock.unlock();
            return Err(ProcessError::Allocation);
        }

        p.pagetable = hal::proc_pagetable(p.trapframe as *mut u8);
        if p.pagetable.is_null() {
            p.free();
            p.lock.unlock();
            return Err(ProcessError::Allocation);
        }

        // Fresh context resumes at `forkret`, which returns to user space.
        p.context = Context::new();
        p.context.ra = super::scheduler::forkret as usize as u64;
        p.context.sp = p.kernel_stack + PAGE_SIZE;

        log::debug!("proc {} allocated (slot {})", p.pid, index);
        Ok(p)
    }

    /// Free a slot and the data hanging from it. `self.lock` must be held.
    pub unsafe fn free(&mut self) {
        if !self.trapframe.is_null() {
            hal::kfree(self.trapframe as *mut u8);
        }
        self.trapframe = null_mut();
        if !self.pagetable.is_null() {
            hal::proc_freepagetable(self.pagetable, self.memory_allocated);
        }
        self.pagetable = null_mut();
        self.memory_allocated = 0;
        self.pid = 0;
        self.parent = null_mut();
        self.name = [0; 16];
        self.chan = null_mut();
        self.killed = false;
        self.exit_status = 0;
        self.rq_next = null_mut();
        self.state = ProcessState::Unused;
    }

    /// Assign every slot's fixed kernel-stack virtual address
    /// (`spec.md` §3 "kernel_stack"). Must run exactly once at boot,
    /// before any slot is allocated, mirroring the teacher's and
    /// `original_source/kernel/proc.c`'s `procinit()` populating
    /// `p->kstack` from a `proc_mapstacks`-mapped layout.
    pub unsafe fn init_kernel_stacks() {
        for (i, p) in PROC_TABLE.iter_mut().enumerate() {
            p.kernel_stack = hal::kstack_va(i);
        }
    }

    /// Install the initial `/init`-invoking process, mark it runnable
    /// and enqueue it (`spec.md` §4.A "first-user-process setup").
    pub unsafe fn user_init() {
        let p = Process::alloc().expect("userinit: out of process slots");

        INITPROC = addr_of_mut!(*p);
        p.memory_allocated = PAGE_SIZE;

        (*p.trapframe).epc = 0;
        (*p.trapframe).sp = PAGE_SIZE;
        p.name = *b"initcode\0\0\0\0\0\0\0\0";
        p.cwd = null_mut();

        p.state = ProcessState::Runnable;
        runqueue::enqueue(addr_of_mut!(*p));
        p.lock.unlock();
    }

    /// Create a new process, copying the parent. Sets up the child's
    /// kernel stack to return as if from the `fork` syscall
    /// (`spec.md` §4.A `fork()`).
    pub unsafe fn fork() -> Result<i32, ProcessError> {
        let parent = Process::current().expect("fork: no current process");
        let child = Process::alloc()?;

        if hal::uvmcopy(parent.pagetable, child.pagetable, parent.memory_allocated) < 0 {
            child.free();
            child.lock.unlock();
            return Err(ProcessError::Allocation);
        }
        child.memory_allocated = parent.memory_allocated;
        *child.trapframe = *parent.trapframe;
        // Fork returns 0 in the child.
        (*child.trapframe).a0 = 0;

        for (i, file) in parent.open_files.iter().enumerate() {
            if !file.is_null() {
                child.open_files[i] = hal::filedup(parent.open_files[i]);
            }
        }
        child.cwd = hal::idup(parent.cwd);
        child.name = parent.name;

        // Child inherits the parent's *current* priority, not its base
        // priority (`spec.md` §4.A): a parent that has been aged up
        // passes that advantage on, but a parent that was niced down
        // does not hand back its original base automatically.
        child.prio = parent.prio;
        child.wait_ticks = 0;

        let pid = child.pid;
        child.lock.unlock();

        {
            let _guard = WAIT_LOCK.lock();
            child.parent = addr_of!(*parent).cast_mut();
        }
        {
            let _guard = child.lock.lock();
            child.state = ProcessState::Runnable;
            runqueue::enqueue(addr_of_mut!(*child));
        }

        log::debug!("proc {} forked from {}", pid, parent.pid);
        Ok(pid)
    }

    /// Pass this process's abandoned children to `/init`. Caller must
    /// hold `WAIT_LOCK`.
    unsafe fn reparent(&self) {
        for p in PROC_TABLE.iter_mut() {
            if p.parent == addr_of!(*self).cast_mut() {
                p.parent = INITPROC;
                wakeup(INITPROC.cast());
            }
        }
    }

    /// Exit the current process; never returns
    /// (`spec.md` §4.A `exit(status)`).
    pub unsafe fn exit(&mut self, status: i32) -> ! {
        if addr_of_mut!(*self) == INITPROC {
            panic!("init exiting");
        }

        for file in self.open_files.iter_mut() {
            if !file.is_null() {
                hal::fileclose(*file);
                *file = null_mut();
            }
        }

        hal::fs_begin_op();
        hal::iput(self.cwd);
        hal::fs_end_op();
        self.cwd = null_mut();

        {
            let _guard = WAIT_LOCK.lock();

            // Give any children to init.
            self.reparent();
            // Parent might be sleeping in wait_for_child().
            wakeup(self.parent.cast());

            // Acquired while WAIT_LOCK is still held (lock order:
            // WAIT_LOCK before any slot lock); _guard drops at the end
            // of this block, releasing WAIT_LOCK while self.lock is
            // still held.
            self.lock.lock_unguarded();
            self.exit_status = status;
            self.state = ProcessState::Zombie;
        }
        // schedule() is called with no slot locks held (spec.md §4.D).
        self.lock.unlock();

        log::debug!("proc {} exited with status {}", self.pid, status);
        schedule();
        unreachable!("a zombie process was rescheduled");
    }

    /// Wait for a child to exit and return its pid
    /// (`spec.md` §4.A `wait(status_out)`).
    pub unsafe fn wait_for_child(&mut self, addr: u64) -> Result<i32, ProcessError> {
        let guard = WAIT_LOCK.lock();

        loop {
            let mut has_children = false;

            for p in PROC_TABLE.iter_mut() {
                if p.parent != addr_of_mut!(*self) {
                    continue;
                }
                has_children = true;

                // Ensure the child isn't still inside exit() or swtch().
                p.lock.lock_unguarded();

                if p.state == ProcessState::Zombie {
                    let pid = p.pid;

                    if addr != 0
                        && hal::copyout(
                            self.pagetable,
                            addr,
                            addr_of_mut!(p.exit_status) as *const u8,
                            core::mem::size_of::<i32>() as u64,
                        ) < 0
                    {
                        // §7 "Copy failure": fail the whole call, leave
                        // the zombie unreaped for a retry.
                        p.lock.unlock();
                        return Err(ProcessError::PageError);
                    }

                    p.free();
                    p.lock.unlock();
                    return Ok(pid);
                }

                p.lock.unlock();
            }

            if !has_children {
                return Err(ProcessError::NoChildren);
            }
            if self.is_killed() {
                return Err(ProcessError::Killed);
            }

            // DOC: wait-sleep. `guard` releases `WAIT_LOCK` for the
            // duration of the sleep and reacquires it on wakeup.
            super::scheduler::sleep(addr_of_mut!(*self).cast(), &guard);
        }
    }

    /// Set `killed` on the target and, if it is sleeping, make it
    /// runnable so it can observe the flag at its next user-space
    /// return (`spec.md` §4.A `kill(pid)`). Never targets a pid-0 idle
    /// slot: idle slots are not reachable by pid (`SPEC_FULL.md` §11).
    pub fn kill(pid: i32) -> bool {
        if pid == 0 {
            return false;
        }
        unsafe {
            for p in PROC_TABLE.iter_mut() {
                let _guard = p.lock.lock();
                if p.pid == pid {
                    p.killed = true;
                    if p.state == ProcessState::Sleeping {
                        p.state = ProcessState::Runnable;
                        runqueue::enqueue(addr_of_mut!(*p));
                    }
                    log::debug!("proc {} killed", pid);
                    return true;
                }
            }
        }
        false
    }

    pub fn is_killed(&self) -> bool {
        let _guard = self.lock.lock();
        self.killed
    }

    pub fn set_killed(&mut self, killed: bool) {
        let _guard = self.lock.lock();
        self.killed = killed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_process_is_unused_with_default_priority() {
        let p = Process::new();
        assert_eq!(p.state, ProcessState::Unused);
        assert_eq!(p.prio, PRIO_DEFAULT);
        assert_eq!(p.base_prio, PRIO_DEFAULT);
        assert_eq!(p.wait_ticks, 0);
        assert!(!p.killed);
    }

    #[test]
    fn kill_refuses_pid_zero() {
        assert!(!Process::kill(0));
    }
}
