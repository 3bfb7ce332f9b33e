//! Short, non-sleeping mutual exclusion.
//!
//! Every lock this crate defines at any other level — `Process::lock`,
//! `runq.lock`, semaphore and rwlock slot locks, `wait_lock`, `pid_lock`
//! — is one of these. Adapted from the teacher's `sync/spinlock.rs`;
//! `lock_unguarded`/`unlock` are kept `unsafe` for the one caller
//! (`sched()`) that must hold a lock across a context switch without a
//! `Drop`-scoped guard (`spec.md` §4.C step 2).

use crate::intr::{pop_off, push_off};
use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct Spinlock {
    locked: AtomicBool,
}
impl Spinlock {
    pub const fn new() -> Spinlock {
        Spinlock {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire without producing a guard. Used only where the lock must
    /// outlive the current stack frame (held across `sched()`'s switch).
    ///
    /// # Safety
    /// Caller must call `unlock` exactly once to release.
    pub unsafe fn lock_unguarded(&self) {
        push_off();
        while self.locked.swap(true, Ordering::Acquire) {
            core::hint::spin_loop();
        }
    }

    pub fn lock(&self) -> SpinlockGuard<'_> {
        unsafe { self.lock_unguarded() };
        SpinlockGuard { lock: self }
    }

    /// # Safety
    /// Caller must hold the lock (via `lock_unguarded`).
    pub unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
        pop_off();
    }

    pub fn held(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}
unsafe impl Sync for Spinlock {}

pub struct SpinlockGuard<'l> {
    pub(crate) lock: &'l Spinlock,
}
impl<'l> Drop for SpinlockGuard<'l> {
    fn drop(&mut self) {
        unsafe { self.lock.unlock() }
    }
}
