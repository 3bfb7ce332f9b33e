//! Per-CPU dispatcher and sleep/wakeup (`spec.md` §4.C, §4.D, §4.G).
//!
//! `schedule()` is the sole dispatch primitive: the idle loop
//! (`idle_main`) re-enters it forever with interrupts enabled between
//! rounds, and `yield()`/`sleep()`/`exit()` each call it once, directly,
//! after releasing their own slot lock and updating their own state —
//! matching `examples/original_source/kernel/proc.c`'s actual
//! `schedule()`/`yield()`/`sleep()`/`exit()`, which all give up the CPU
//! with no slot lock held. That source also carries a separate,
//! never-called `sched()` documenting the classical hold-lock-across-
//! switch discipline; kept below for the same reason (`spec.md` §4.C
//! names it as a distinct operation), but nothing here calls it either.

use super::cpu::Cpu;
use super::process::{Process, ProcessState, PROC_TABLE};
use super::runqueue;
use crate::hal;
use crate::sync::spinlock::{Spinlock, SpinlockGuard};
use core::ffi::c_void;
use core::ptr::{addr_of_mut, null_mut};

/// Channel used by `sleep(ticks)` (`spec.md` §6) — any waiter parked
/// here is re-checked every tick alongside aging/preemption.
static TICKS_LOCK: Spinlock = Spinlock::new();
static mut TICKS_CHAN: u8 = 0;

/// Pick the next slot to run and switch to it, returning once this CPU
/// has been switched back to the calling context (`spec.md` §4.C
/// `schedule()`). Called with no slot locks held; none are held on
/// return either.
pub unsafe fn schedule() {
    let cpu = Cpu::current();
    let prev: *mut Process = cpu.proc;

    let saved_intena = hal::intr_get() != 0;
    hal::intr_off();

    let next: *mut Process = loop {
        let candidate = runqueue::pick_next();
        if candidate.is_null() {
            break addr_of_mut!(cpu.idleproc);
        }
        (*candidate).lock.lock_unguarded();
        if (*candidate).state == ProcessState::Runnable {
            (*candidate).state = ProcessState::Running;
            (*candidate).wait_ticks = 0;
            (*candidate).lock.unlock();
            break candidate;
        }
        // Raced with a kill/wakeup that changed the state again before
        // we got the lock; release and try another round.
        (*candidate).lock.unlock();
    };

    cpu.proc = next;
    if prev != next {
        hal::swtch(addr_of_mut!((*prev).context), addr_of_mut!((*next).context));
    }

    if saved_intena {
        hal::intr_on();
    }
}

/// Idle loop entry point (`spec.md` §4.C "Idle loop"): enables
/// interrupts and re-enters `schedule()` forever. The idle slot is
/// never enqueued on the runqueue; reachable only through
/// `schedule()`'s fallback branch.
#[no_mangle]
pub unsafe extern "C" fn idle_main() -> ! {
    loop {
        hal::intr_on();
        schedule();
    }
}

/// The classical "opposite half" of `schedule()` named in `spec.md`
/// §4.C: requires the caller's own slot lock held, `noff == 1`, state
/// != Running, interrupts off. Present for parity with
/// `examples/original_source/kernel/proc.c`'s own `sched()`, documented
/// there in identical terms but never actually called — every real
/// call site there (and here) gives up the CPU through `schedule()`
/// after releasing its own lock instead.
#[allow(dead_code)]
pub unsafe fn sched() {
    let p = Process::current().expect("sched: no current process");
    let cpu = Cpu::current();

    if !p.lock.held() {
        panic!("sched: p.lock not held");
    }
    if cpu.noff != 1 {
        panic!("sched: locks");
    }
    if p.state == ProcessState::Running {
        panic!("sched: running");
    }
    if hal::intr_get() != 0 {
        panic!("sched: interruptible");
    }

    let intena = cpu.intena;
    hal::swtch(addr_of_mut!(p.context), addr_of_mut!(cpu.context));
    cpu.intena = intena;
}

/// Give up the CPU for one scheduling round, without blocking
/// (`spec.md` §4.C `yield()`).
pub unsafe fn r#yield() {
    let p = Process::current().expect("yield: no current process");
    p.lock.lock_unguarded();
    p.state = ProcessState::Runnable;
    p.wait_ticks = 0;
    runqueue::enqueue(addr_of_mut!(*p));
    p.lock.unlock();

    schedule();
}

/// First instruction executed by a freshly allocated slot
/// (`p.context.ra` is primed to this address in `Process::alloc`). By
/// the time this runs, `schedule()` has already flipped the slot to
/// Running and released its lock before switching here, so there is
/// nothing left to unlock.
#[no_mangle]
pub unsafe extern "C" fn forkret() -> ! {
    hal::usertrap_ret();
}

/// Atomically release `external_lock` and go to sleep on `chan`, then
/// reacquire `external_lock` before returning (`spec.md` §4.D
/// `sleep(chan, external_lock)`). Caller must already hold
/// `external_lock` (via the guard it passes in); that guard remains
/// valid and locked across the call.
pub unsafe fn sleep(chan: *mut c_void, external_lock: &SpinlockGuard) {
    let p = Process::current().expect("sleep: no current process");
    let lock: &Spinlock = external_lock.lock;

    // Acquiring p.lock before releasing external_lock (rather than the
    // reverse) is what makes "release external_lock and mark sleeping"
    // atomic from a waker's point of view: a wakeup() scanning under
    // p.lock can never observe chan set without state == Sleeping.
    p.lock.lock_unguarded();
    lock.unlock();

    p.chan = chan;
    if p.state == ProcessState::Runnable {
        runqueue::dequeue(addr_of_mut!(*p));
    }
    p.state = ProcessState::Sleeping;
    p.lock.unlock();

    schedule();

    // Tidy up: re-establish the "not sleeping => chan == 0" invariant.
    p.lock.lock_unguarded();
    p.chan = null_mut();
    p.lock.unlock();

    lock.lock_unguarded();
}

/// Wake every slot sleeping on `chan` (`spec.md` §4.D `wakeup(chan)`).
/// Must be called with no slot locks held.
pub unsafe fn wakeup(chan: *mut c_void) {
    if chan.is_null() {
        return;
    }
    for p in PROC_TABLE.iter_mut() {
        let _guard = p.lock.lock();
        if p.state == ProcessState::Sleeping && p.chan == chan {
            p.state = ProcessState::Runnable;
            p.wait_ticks = 0;
            runqueue::enqueue(addr_of_mut!(*p));
        }
    }
}

/// Timer-tick hook: ages the runqueue, then raises this CPU's
/// `preempt_pending` flag if a runnable slot is now owed the CPU
/// (`spec.md` §4.G). The external trap-return path consumes the flag.
pub unsafe fn on_tick() {
    runqueue::age_tick();
    wakeup(addr_of_mut!(TICKS_CHAN).cast());

    if let Some(p) = Process::current() {
        if runqueue::should_preempt(p.prio) {
            Cpu::current().preempt_pending = true;
        }
    }
}

/// Block the current process until `ticks` timer ticks have elapsed,
/// waking early (with `false`) if it is killed while waiting
/// (`spec.md` §6 `sleep(ticks)`).
///
/// # Safety
/// Must be called from process context.
pub unsafe fn sleep_ticks(ticks: u32) -> bool {
    let guard = TICKS_LOCK.lock();
    let start = hal::uptime_ticks();
    while hal::uptime_ticks().wrapping_sub(start) < ticks {
        if Process::current().map_or(false, |p| p.is_killed()) {
            return false;
        }
        sleep(addr_of_mut!(TICKS_CHAN).cast(), &guard);
    }
    true
}
