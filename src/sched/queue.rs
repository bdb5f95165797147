/*
 * Wait Queue Handle
 *
 * A `Queue` is an opaque handle naming a FIFO list of threads that lives in
 * the scheduler's own queue table (see `sched::mod`). Handles rather than
 * owned collections let a thread's `wait_channel` name the queue it sleeps
 * on, and let `cancel` find and drain that queue, without every queue owner
 * (a mutex, a process's `p_wait`) handing a `&mut` reference back into the
 * scheduler on every call.
 */

/// Id of the global run queue, reserved at scheduler init.
pub const RUN_QUEUE_ID: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Queue(pub(super) u64);

impl Queue {
    pub fn id(&self) -> u64 {
        self.0
    }

    /// A handle naming no real queue in the scheduler's table, usable only
    /// to build a `Process`/`Mutex` fixture in a unit test that never calls
    /// `sleep_on`/`wakeup_on` on it.
    #[cfg(test)]
    pub fn reserved_for_tests() -> Self {
        Self(u64::MAX)
    }
}
