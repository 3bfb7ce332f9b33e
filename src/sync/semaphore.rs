//! Counting semaphore table (`spec.md` §4.E).
//!
//! Grounded directly on `examples/original_source/kernel/semaphore.c`:
//! a fixed table of `{lock, value}` pairs, channel key = address of the
//! slot, waiters parked with the crate's `sleep`/`wakeup` pair.

use super::spinlock::Spinlock;
use crate::param::MAXSEM;
use crate::proc::scheduler;
use array_macro::array;
use core::ptr::addr_of_mut;

pub struct Semaphore {
    lock: Spinlock,
    value: i32,
}
impl Semaphore {
    const fn new() -> Semaphore {
        Semaphore {
            lock: Spinlock::new(),
            value: 0,
        }
    }
}
unsafe impl Sync for Semaphore {}

static mut SEM_TABLE: [Semaphore; MAXSEM] = array![_ => Semaphore::new(); MAXSEM];

/// Validate a user-supplied semaphore id. Out-of-range ids are never a
/// kernel fault — callers fold `None` into a `-1` return to user mode
/// and otherwise no-op (`spec.md` §4.E, §7 "Invalid argument").
fn valid_id(id: i32) -> Option<usize> {
    if id < 0 || id as usize >= MAXSEM {
        None
    } else {
        Some(id as usize)
    }
}

/// `sem_init(id, value)`.
pub fn init(id: i32, value: i32) -> bool {
    let Some(id) = valid_id(id) else {
        return false;
    };
    unsafe {
        let sem = &mut SEM_TABLE[id];
        let _guard = sem.lock.lock();
        sem.value = value;
    }
    true
}

/// `sem_wait(id)`: block while the semaphore reads zero, then consume
/// one unit.
///
/// # Safety
/// Must be called from process context (a current process must exist).
pub unsafe fn wait(id: i32) -> bool {
    let Some(id) = valid_id(id) else {
        return false;
    };
    let sem = &mut SEM_TABLE[id];
    let guard = sem.lock.lock();
    while sem.value == 0 {
        scheduler::sleep(addr_of_mut!(*sem).cast(), &guard);
    }
    sem.value -= 1;
    true
}

/// `sem_signal(id)`: add one unit and wake every waiter to re-check.
///
/// # Safety
/// Must be called from process context.
pub unsafe fn signal(id: i32) -> bool {
    let Some(id) = valid_id(id) else {
        return false;
    };
    let sem = &mut SEM_TABLE[id];
    let _guard = sem.lock.lock();
    sem.value += 1;
    scheduler::wakeup(addr_of_mut!(*sem).cast());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_too_large_ids() {
        assert_eq!(valid_id(-1), None);
        assert_eq!(valid_id(MAXSEM as i32), None);
        assert_eq!(valid_id(0), Some(0));
        assert_eq!(valid_id(MAXSEM as i32 - 1), Some(MAXSEM - 1));
    }
}
