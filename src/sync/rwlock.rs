//! Writer-preferring read/write lock table (`spec.md` §4.F).
//!
//! Grounded directly on `examples/original_source/kernel/rwlock.c`: a
//! waiting writer blocks new readers, a broadcast `wakeup` plus
//! re-check loops stand in for a proper condition variable, and
//! spurious wakeups are tolerated.

use super::spinlock::Spinlock;
use crate::param::MAXRW;
use crate::proc::scheduler;
use array_macro::array;
use core::ptr::addr_of_mut;

pub struct RwLock {
    lock: Spinlock,
    readers: i32,
    writer: bool,
    waiting_writers: i32,
}
impl RwLock {
    const fn new() -> RwLock {
        RwLock {
            lock: Spinlock::new(),
            readers: 0,
            writer: false,
            waiting_writers: 0,
        }
    }
}
unsafe impl Sync for RwLock {}

static mut RW_TABLE: [RwLock; MAXRW] = array![_ => RwLock::new(); MAXRW];

/// Validate a user-supplied rwlock id (`spec.md` §7 "Invalid argument").
fn valid_id(id: i32) -> Option<usize> {
    if id < 0 || id as usize >= MAXRW {
        None
    } else {
        Some(id as usize)
    }
}

/// `rw_init(id)`.
pub fn init(id: i32) -> bool {
    let Some(id) = valid_id(id) else {
        return false;
    };
    unsafe {
        let rw = &mut RW_TABLE[id];
        let _guard = rw.lock.lock();
        rw.readers = 0;
        rw.writer = false;
        rw.waiting_writers = 0;
    }
    true
}

/// `rw_rlock(id)`: wait out any writer holding or waiting, then join
/// as a reader.
///
/// # Safety
/// Must be called from process context.
pub unsafe fn rlock(id: i32) -> bool {
    let Some(id) = valid_id(id) else {
        return false;
    };
    let rw = &mut RW_TABLE[id];
    let guard = rw.lock.lock();
    while rw.writer || rw.waiting_writers > 0 {
        scheduler::sleep(addr_of_mut!(*rw).cast(), &guard);
    }
    rw.readers += 1;
    true
}

/// `rw_runlock(id)`: leave as a reader; wake waiters once the last
/// reader is gone.
///
/// # Safety
/// Must be called from process context.
pub unsafe fn runlock(id: i32) -> bool {
    let Some(id) = valid_id(id) else {
        return false;
    };
    let rw = &mut RW_TABLE[id];
    let _guard = rw.lock.lock();
    rw.readers -= 1;
    if rw.readers == 0 {
        scheduler::wakeup(addr_of_mut!(*rw).cast());
    }
    true
}

/// `rw_wlock(id)`: register as a waiting writer (blocking new readers
/// immediately), then wait out any current writer or readers.
///
/// # Safety
/// Must be called from process context.
pub unsafe fn wlock(id: i32) -> bool {
    let Some(id) = valid_id(id) else {
        return false;
    };
    let rw = &mut RW_TABLE[id];
    let guard = rw.lock.lock();
    rw.waiting_writers += 1;
    while rw.writer || rw.readers > 0 {
        scheduler::sleep(addr_of_mut!(*rw).cast(), &guard);
    }
    rw.waiting_writers -= 1;
    rw.writer = true;
    true
}

/// `rw_wunlock(id)`: release, waking every reader/writer waiting on
/// this channel.
///
/// # Safety
/// Must be called from process context.
pub unsafe fn wunlock(id: i32) -> bool {
    let Some(id) = valid_id(id) else {
        return false;
    };
    let rw = &mut RW_TABLE[id];
    let _guard = rw.lock.lock();
    rw.writer = false;
    scheduler::wakeup(addr_of_mut!(*rw).cast());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_too_large_ids() {
        assert_eq!(valid_id(-1), None);
        assert_eq!(valid_id(MAXRW as i32), None);
        assert_eq!(valid_id(0), Some(0));
        assert_eq!(valid_id(MAXRW as i32 - 1), Some(MAXRW - 1));
    }

    #[test]
    fn fresh_lock_has_no_readers_or_writer() {
        let rw = RwLock::new();
        assert_eq!(rw.readers, 0);
        assert!(!rw.writer);
        assert_eq!(rw.waiting_writers, 0);
    }
}
