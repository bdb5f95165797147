/*
 * In-kernel Integration Test Harness
 *
 * SPEC_FULL.md's end-to-end scenarios (S1-S6) each span more than one
 * module -- name resolution plus the syscall layer plus the process table
 * for S1-S5, the scheduler plus the mutex built over it for S6 -- so they
 * live here rather than being colocated with any single module's
 * `#[cfg(test)]` block. `fixture::boot()` brings up the same sched/process/
 * fs triad `main::kstart` does, minus the hardware-facing steps, so every
 * scenario starts from a fresh root.
 *
 * Not `mod`-declared outside `#[cfg(test)]`: this tree has no runtime
 * caller, only `#[test]` functions.
 */

pub mod fixture;
mod proc_core;
mod sched_core;
mod vfs_core;
