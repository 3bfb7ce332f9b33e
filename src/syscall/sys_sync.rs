//! Semaphore and rwlock syscalls (`spec.md` §6, §4.E, §4.F).

use crate::sync::{rwlock, semaphore};

pub fn sys_sem_init(id: i32, value: i32) -> i32 {
    bool_to_status(semaphore::init(id, value))
}

/// # Safety
/// Must be called from process context.
pub unsafe fn sys_sem_wait(id: i32) -> i32 {
    bool_to_status(semaphore::wait(id))
}

/// # Safety
/// Must be called from process context.
pub unsafe fn sys_sem_signal(id: i32) -> i32 {
    bool_to_status(semaphore::signal(id))
}

pub fn sys_rw_init(id: i32) -> i32 {
    bool_to_status(rwlock::init(id))
}

/// # Safety
/// Must be called from process context.
pub unsafe fn sys_rw_rlock(id: i32) -> i32 {
    bool_to_status(rwlock::rlock(id))
}

/// # Safety
/// Must be called from process context.
pub unsafe fn sys_rw_runlock(id: i32) -> i32 {
    bool_to_status(rwlock::runlock(id))
}

/// # Safety
/// Must be called from process context.
pub unsafe fn sys_rw_wlock(id: i32) -> i32 {
    bool_to_status(rwlock::wlock(id))
}

/// # Safety
/// Must be called from process context.
pub unsafe fn sys_rw_wunlock(id: i32) -> i32 {
    bool_to_status(rwlock::wunlock(id))
}

fn bool_to_status(ok: bool) -> i32 {
    if ok {
        0
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{MAXRW, MAXSEM};

    #[test]
    fn out_of_range_ids_fail_without_touching_locks() {
        assert_eq!(sys_sem_init(-1, 0), -1);
        assert_eq!(sys_sem_init(MAXSEM as i32, 0), -1);
        assert_eq!(sys_rw_init(-1), -1);
        assert_eq!(sys_rw_init(MAXRW as i32), -1);
    }
}
