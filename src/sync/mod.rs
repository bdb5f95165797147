/*
 * Thread-context Synchronization Primitives
 *
 * Blocking primitives built directly on the scheduler's queue/sleep/wakeup
 * operations. Unlike `spin::Mutex` (used throughout the kernel for short
 * IPL-protected critical sections over plain data), these block the calling
 * thread and may only be used from thread context.
 */

pub mod mutex;

pub use mutex::KMutex;
