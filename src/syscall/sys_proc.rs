//! Process-lifecycle syscalls (`spec.md` §6): `fork`, `exit`, `wait`,
//! `kill`, `sleep`, `uptime`.

use crate::hal;
use crate::proc::process::Process;
use crate::proc::scheduler;
use crate::syscall::SchedError;

/// `fork` — no arguments, returns child pid or -1.
pub unsafe fn sys_fork() -> i32 {
    Process::fork().map_err(SchedError::from).unwrap_or(-1)
}

/// `exit(status)` — never returns.
pub unsafe fn sys_exit(status: i32) -> ! {
    Process::current()
        .expect("exit: no current process")
        .exit(status)
}

/// `wait(addr)` — `addr` is a user pointer to an `i32` exit-status slot,
/// or 0 to not copy one out. Returns the reaped child's pid or -1.
pub unsafe fn sys_wait(addr: u64) -> i32 {
    Process::current()
        .expect("wait: no current process")
        .wait_for_child(addr)
        .map_err(SchedError::from)
        .unwrap_or(-1)
}

/// `kill(pid)` — returns 0 if a matching process was found, else -1.
pub fn sys_kill(pid: i32) -> i32 {
    if Process::kill(pid) {
        0
    } else {
        -1
    }
}

/// `sleep(ticks)` — blocks for `ticks` timer ticks; returns 0, or -1 if
/// killed while waiting.
pub unsafe fn sys_sleep(ticks: u32) -> i32 {
    if scheduler::sleep_ticks(ticks) {
        0
    } else {
        -1
    }
}

/// `uptime` — the monotonic tick counter.
pub fn sys_uptime() -> i32 {
    unsafe { hal::uptime_ticks() as i32 }
}
