pub mod rwlock;
pub mod semaphore;
pub mod spinlock;
