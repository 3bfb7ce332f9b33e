//! Compile-time kernel parameters.
//!
//! Mirrors the teacher's flat constant module; the priority-scheduling
//! block is new, carried over from the xv6-lab `param.h` this crate's
//! scheduler was distilled from.

use static_assertions::const_assert;

/// Maximum number of processes
pub const NPROC: usize = 64;
/// Maximum number of CPUs
pub const NCPU: usize = 8;
/// Maximum number of open files per process
pub const NOFILE: usize = 16;
/// Page size assumed when laying out a fresh kernel stack / context.
pub const PAGE_SIZE: u64 = 4096;

// --- Priority scheduling parameters ---

/// Number of priority levels, 0 (highest) .. NPRIO-1 (lowest).
pub const NPRIO: usize = 32;
pub const PRIO_MIN: i32 = 0;
pub const PRIO_MAX: i32 = (NPRIO - 1) as i32;
/// Default base priority for newly allocated processes.
pub const PRIO_DEFAULT: i32 = 20;
/// Ticks a runnable process may wait before its priority is raised by one.
pub const AGING_TICKS: u32 = 20;

/// Number of counting semaphores in the kernel table.
pub const MAXSEM: usize = 32;
/// Number of read/write locks in the kernel table.
pub const MAXRW: usize = 32;

const_assert!(PRIO_MAX as usize == NPRIO - 1);
const_assert!(PRIO_MIN == 0);
const_assert!(PRIO_DEFAULT >= PRIO_MIN && PRIO_DEFAULT <= PRIO_MAX);
const_assert!(AGING_TICKS > 0);
const_assert!(NPROC > 0);
const_assert!(NCPU > 0);
