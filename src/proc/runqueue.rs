//! Priority multi-level runqueue (`spec.md` §4.B).
//!
//! `RunQueueInner` holds only the intrusive bucket links and the
//! `highest_nonempty` cache — no knowledge of CPUs or locks — so its
//! bucket/aging math can be exercised directly on the stack. The free
//! functions below add the locking and the `Cpu::current()`-dependent
//! preemption side effect and are the only entry points the rest of
//! the crate uses.

use super::cpu::Cpu;
use super::process::Process;
use crate::param::{AGING_TICKS, NPRIO, PRIO_MIN};
use crate::sync::spinlock::Spinlock;
use core::ptr::null_mut;

#[derive(Copy, Clone)]
struct Bucket {
    head: *mut Process,
    tail: *mut Process,
}
impl Bucket {
    const fn empty() -> Bucket {
        Bucket {
            head: null_mut(),
            tail: null_mut(),
        }
    }
}

pub struct RunQueueInner {
    buckets: [Bucket; NPRIO],
    /// Cached index of the lowest-numbered non-empty bucket, or -1.
    highest_nonempty: i32,
}
impl RunQueueInner {
    pub const fn new() -> RunQueueInner {
        RunQueueInner {
            buckets: [Bucket::empty(); NPRIO],
            highest_nonempty: -1,
        }
    }

    fn rescan_highest(&mut self) {
        self.highest_nonempty = -1;
        for (i, b) in self.buckets.iter().enumerate() {
            if !b.head.is_null() {
                self.highest_nonempty = i as i32;
                break;
            }
        }
    }

    /// Append `p` to the tail of `q[p.prio]`, reset its `wait_ticks`,
    /// and refresh `highest_nonempty` if `p.prio` is now the
    /// lowest-numbered non-empty level.
    ///
    /// # Safety
    /// `p` must point to a live slot not already linked into any bucket.
    pub unsafe fn push_back(&mut self, p: *mut Process) {
        (*p).wait_ticks = 0;
        (*p).rq_next = null_mut();

        let level = (*p).prio as usize;
        let bucket = &mut self.buckets[level];
        if bucket.tail.is_null() {
            bucket.head = p;
        } else {
            (*bucket.tail).rq_next = p;
        }
        bucket.tail = p;

        if self.highest_nonempty < 0 || (level as i32) < self.highest_nonempty {
            self.highest_nonempty = level as i32;
        }
    }

    /// Unlink `p` from `q[p.prio]`. No-op if `p` is not linked there.
    ///
    /// # Safety
    /// `p` must point to a live slot.
    pub unsafe fn remove(&mut self, p: *mut Process) {
        let level = (*p).prio as usize;
        let bucket = &mut self.buckets[level];

        let mut prev: *mut Process = null_mut();
        let mut cur = bucket.head;
        while !cur.is_null() {
            if cur == p {
                if prev.is_null() {
                    bucket.head = (*cur).rq_next;
                } else {
                    (*prev).rq_next = (*cur).rq_next;
                }
                if bucket.tail == cur {
                    bucket.tail = prev;
                }
                (*cur).rq_next = null_mut();
                break;
            }
            prev = cur;
            cur = (*cur).rq_next;
        }

        if bucket.head.is_null() && level as i32 == self.highest_nonempty {
            self.rescan_highest();
        }
    }

    /// Remove and return the head of the highest-priority non-empty
    /// bucket, or null if the runqueue is empty. The returned slot's
    /// state is left untouched.
    pub fn pick_next(&mut self) -> *mut Process {
        if self.highest_nonempty < 0 {
            return null_mut();
        }
        let level = self.highest_nonempty as usize;
        let bucket = &mut self.buckets[level];
        let p = bucket.head;
        unsafe {
            bucket.head = (*p).rq_next;
            (*p).rq_next = null_mut();
        }
        if bucket.head.is_null() {
            bucket.tail = null_mut();
            self.rescan_highest();
        }
        p
    }

    /// True iff some runnable slot has priority `<= cur_prio` — the
    /// `<=`, not `<`, is deliberate: equal-priority readiness also
    /// triggers a reschedule (`SPEC_FULL.md` §11).
    pub fn should_preempt(&self, cur_prio: i32) -> bool {
        self.highest_nonempty >= 0 && self.highest_nonempty <= cur_prio
    }

    /// Advance every enqueued slot's `wait_ticks` by one; a slot that
    /// has waited `AGING_TICKS` and is not already at `PRIO_MIN` moves
    /// down one bucket. `rq_next` is saved before relinking since
    /// aging mutates the very bucket being walked.
    pub fn age_tick(&mut self) {
        for level in 0..NPRIO {
            let mut cur = self.buckets[level].head;
            while !cur.is_null() {
                let next = unsafe { (*cur).rq_next };
                unsafe {
                    (*cur).wait_ticks += 1;
                    if (*cur).wait_ticks >= AGING_TICKS && (*cur).prio > PRIO_MIN {
                        self.remove(cur);
                        (*cur).prio -= 1;
                        (*cur).wait_ticks = 0;
                        self.push_back(cur);
                    }
                }
                cur = next;
            }
        }
    }
}
unsafe impl Send for RunQueueInner {}

static RUNQ_LOCK: Spinlock = Spinlock::new();
static mut RUNQ: RunQueueInner = RunQueueInner::new();

/// Insert `p` (already `Runnable`) into the runqueue and, if the
/// calling CPU's currently running slot has a strictly lower priority
/// (numerically greater) than `p.prio`, raise its `preempt_pending`
/// flag (`spec.md` §4.B `enqueue(p)`).
///
/// # Safety
/// `p` must point to a live, currently-unlinked slot.
pub unsafe fn enqueue(p: *mut Process) {
    {
        let _guard = RUNQ_LOCK.lock();
        RUNQ.push_back(p);
    }

    let cpu = Cpu::current();
    if !cpu.proc.is_null() && (*cpu.proc).prio > (*p).prio {
        cpu.preempt_pending = true;
    }
}

/// Remove `p` from the runqueue (`spec.md` §4.B `dequeue(p)`).
///
/// # Safety
/// `p` must currently be linked into the runqueue.
pub unsafe fn dequeue(p: *mut Process) {
    let _guard = RUNQ_LOCK.lock();
    RUNQ.remove(p);
}

/// `spec.md` §4.B `pick_next()`.
pub fn pick_next() -> *mut Process {
    let _guard = RUNQ_LOCK.lock();
    unsafe { RUNQ.pick_next() }
}

/// `spec.md` §4.B `should_preempt(cur_prio)`.
pub fn should_preempt(cur_prio: i32) -> bool {
    let _guard = RUNQ_LOCK.lock();
    unsafe { RUNQ.should_preempt(cur_prio) }
}

/// The per-tick aging step, invoked from the timer tick hook (`spec.md` §4.G).
pub fn age_tick() {
    let _guard = RUNQ_LOCK.lock();
    unsafe { RUNQ.age_tick() };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::PRIO_DEFAULT;

    fn slot(prio: i32) -> Process {
        let mut p = Process::new();
        p.prio = prio;
        p
    }

    #[test]
    fn fifo_within_a_priority_level() {
        let mut rq = RunQueueInner::new();
        let mut a = slot(PRIO_DEFAULT);
        let mut b = slot(PRIO_DEFAULT);
        unsafe {
            rq.push_back(&mut a as *mut _);
            rq.push_back(&mut b as *mut _);
            assert_eq!(rq.pick_next(), &mut a as *mut _);
            assert_eq!(rq.pick_next(), &mut b as *mut _);
        }
        assert!(rq.pick_next().is_null());
    }

    #[test]
    fn picks_lower_numbered_level_first() {
        let mut rq = RunQueueInner::new();
        let mut low = slot(20);
        let mut high = slot(0);
        unsafe {
            rq.push_back(&mut low as *mut _);
            rq.push_back(&mut high as *mut _);
            assert_eq!(rq.pick_next(), &mut high as *mut _);
            assert_eq!(rq.pick_next(), &mut low as *mut _);
        }
    }

    #[test]
    fn highest_nonempty_tracks_true_minimum() {
        let mut rq = RunQueueInner::new();
        let mut a = slot(10);
        let mut b = slot(3);
        unsafe {
            rq.push_back(&mut a as *mut _);
            assert_eq!(rq.highest_nonempty, 10);
            rq.push_back(&mut b as *mut _);
            assert_eq!(rq.highest_nonempty, 3);
            rq.remove(&mut b as *mut _);
            assert_eq!(rq.highest_nonempty, 10);
            rq.remove(&mut a as *mut _);
            assert_eq!(rq.highest_nonempty, -1);
        }
    }

    #[test]
    fn should_preempt_uses_less_than_or_equal() {
        let mut rq = RunQueueInner::new();
        let mut p = slot(5);
        unsafe { rq.push_back(&mut p as *mut _) };
        assert!(rq.should_preempt(5));
        assert!(rq.should_preempt(10));
        assert!(!rq.should_preempt(4));
    }

    #[test]
    fn aging_lowers_priority_after_threshold_and_resets_wait_ticks() {
        let mut rq = RunQueueInner::new();
        let mut p = slot(20);
        unsafe { rq.push_back(&mut p as *mut _) };

        for _ in 0..AGING_TICKS - 1 {
            rq.age_tick();
        }
        assert_eq!(p.prio, 20);

        rq.age_tick();
        assert_eq!(p.prio, 19);
        assert_eq!(p.wait_ticks, 0);
    }

    #[test]
    fn aging_never_lowers_priority_below_prio_min() {
        let mut rq = RunQueueInner::new();
        let mut p = slot(PRIO_MIN);
        unsafe { rq.push_back(&mut p as *mut _) };

        for _ in 0..(AGING_TICKS * 3) {
            rq.age_tick();
        }
        assert_eq!(p.prio, PRIO_MIN);
    }
}
