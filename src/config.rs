/*
 * Kernel-wide Configuration Constants
 *
 * Small compile-time constants shared across the scheduler, process, and VFS
 * subsystems. Kept together here rather than scattered as magic numbers, the
 * way `scheduler::mod` previously kept `THREAD_STACK_SIZE`/`MAX_THREADS` near
 * the code that used them -- these are used from several modules at once so
 * they get a home of their own.
 */

/// Maximum number of live processes. PIDs are allocated modulo this bound.
pub const PROC_MAX_COUNT: usize = 256;

/// Number of file-descriptor slots per process.
pub const NFILES: usize = 32;

/// Maximum length of a single path component.
pub const NAME_LEN: usize = 64;

/// Maximum length of a process name (bounded, truncated on creation).
pub const PROC_NAME_LEN: usize = 32;

/// Default kernel stack size for a new thread.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// PID of the idle process. The only process with no parent.
pub const PID_IDLE: usize = 0;

/// PID of the init process. Universal reparent target for orphans.
pub const PID_INIT: usize = 1;
