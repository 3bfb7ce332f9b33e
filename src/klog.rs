//! Structured logging over the `log` facade.
//!
//! The scheduler and lock tables log state transitions (enqueue,
//! dispatch, aging, wakeup) at `trace`/`debug` level and policy-adjacent
//! events (preemption, kill) at `warn`. Output goes through `hal::console_write`
//! rather than a UART driver owned by this crate, since console I/O is
//! an out-of-scope collaborator (`spec.md` §1); the formatting macro
//! itself follows the teacher's `console/printf.rs` `uprintln!` pattern.

use crate::sync::spinlock::Spinlock;
use core::fmt::Write;
use log::{Level, LevelFilter, Log, Metadata, Record};

struct ConsoleWriter;
impl Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        unsafe { crate::hal::console_write(s.as_ptr(), s.len()) };
        Ok(())
    }
}

static LOG_LOCK: Spinlock = Spinlock::new();

struct KernelLogger;
impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _guard = LOG_LOCK.lock();
        let _ = writeln!(
            ConsoleWriter,
            "[{:<5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }
    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// Install the kernel logger. Must be called once, early in boot,
/// before any CPU starts scheduling.
pub fn init(max_level: LevelFilter) {
    // `set_logger` only fails if called twice; a second call during
    // boot is a kernel bug, so surface it loudly rather than ignore it.
    log::set_logger(&LOGGER).expect("klog::init called more than once");
    log::set_max_level(max_level);
}
