/*
 * Scheduler and Thread State Machine
 *
 * Cooperative, single-CPU scheduler: one global run queue plus however many
 * sleep queues callers (mutexes, a process's `p_wait`, device wait points)
 * request via `queue_init`. Threads move between NO_STATE, RUNNING, SLEEP,
 * SLEEP_CANCELLABLE, and EXITED; a thread is on exactly one queue whenever
 * its state is RUNNING/SLEEP/SLEEP_CANCELLABLE, named by `wait_channel`,
 * which is why queues are referenced by opaque id rather than by an owned
 * collection: `cancel(tid)` needs to find and drain a thread's sleep queue
 * knowing only its id.
 *
 * Every operation below that touches the run queue, a sleep queue, or the
 * current-thread globals runs with interrupts masked (`DisableInterrupts`),
 * mirroring the source's "raise IPL to HIGH" discipline. Only `wakeup_on`,
 * `make_runnable`, and `cancel` are meant to be called from interrupt
 * context; they mask internally and are safe to call there.
 *
 * `switch()` is the only place a CPU context changes. The actual register
 * save/restore (`context_setup`/`context_switch`) is an external collaborator
 * per this core's scope and is represented here by a narrow boundary hook
 * that real low-level code would replace.
 */

pub mod queue;
pub mod thread;

use crate::arch::x86_64::interrupts::{self, DisableInterrupts};
use crate::io::device::Errno;
use crate::process::ProcessId;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::ToString;
use spin::Mutex;

pub use queue::Queue;
pub use thread::{Thread, ThreadId, ThreadState};

struct Scheduler {
    threads: BTreeMap<ThreadId, Thread>,
    queues: BTreeMap<u64, VecDeque<ThreadId>>,
    next_thread_id: usize,
    next_queue_id: u64,
    current: Option<ThreadId>,
}

impl Scheduler {
    fn new() -> Self {
        let mut queues = BTreeMap::new();
        queues.insert(queue::RUN_QUEUE_ID, VecDeque::new());
        Self {
            threads: BTreeMap::new(),
            queues,
            next_thread_id: 1,
            next_queue_id: queue::RUN_QUEUE_ID + 1,
            current: None,
        }
    }

    fn run_queue(&mut self) -> &mut VecDeque<ThreadId> {
        self.queues.get_mut(&queue::RUN_QUEUE_ID).unwrap()
    }
}

static SCHEDULER: Mutex<Option<Scheduler>> = Mutex::new(None);

/// Initialize the scheduler singleton. Must run before any other operation
/// in this module.
pub fn init() {
    *SCHEDULER.lock() = Some(Scheduler::new());
    log::info!("sched: initialized");
}

/// Whether `init` has run yet. Used by early boot code (the log ring
/// buffer, in particular) that runs both before and after the scheduler
/// comes up and needs to know which regime it's in.
pub fn is_enabled() -> bool {
    SCHEDULER.lock().is_some()
}

fn with<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    let mut guard = SCHEDULER.lock();
    let sched = guard.as_mut().expect("sched::init not called");
    f(sched)
}

/// Create a new, not-yet-runnable thread owned by `process_id`.
/// Grounded on `kthread_create`'s bookkeeping half (stack allocation, list
/// linkage, NO_STATE/uncancelled/no-wait-channel initial state); the caller
/// is responsible for eventually calling `make_runnable`.
pub fn create_thread(process_id: ProcessId, name: &str) -> ThreadId {
    let _g = DisableInterrupts::new();
    with(|s| {
        let id = ThreadId(s.next_thread_id);
        s.next_thread_id += 1;
        let t = Thread::new(id, process_id, name.to_string());
        s.threads.insert(id, t);
        id
    })
}

/// Remove a thread's bookkeeping entirely. Only valid once the thread has
/// exited and its owning process has reaped it (mirrors `kthread_destroy`).
pub fn destroy_thread(tid: ThreadId) {
    let _g = DisableInterrupts::new();
    with(|s| {
        debug_assert!(
            s.threads
                .get(&tid)
                .map(|t| t.state == ThreadState::Exited)
                .unwrap_or(true),
            "destroying a thread that has not exited"
        );
        s.threads.remove(&tid);
    });
}

/// Allocate a new empty wait queue.
pub fn queue_init() -> Queue {
    let _g = DisableInterrupts::new();
    with(|s| {
        let id = s.next_queue_id;
        s.next_queue_id += 1;
        s.queues.insert(id, VecDeque::new());
        Queue(id)
    })
}

/// Put the current thread to sleep on `q`. Not cancellable: the thread's
/// cancellation flag, if set, is ignored until the next cancellable
/// suspension point.
pub fn sleep_on(q: Queue) {
    let cur = current_thread_id();
    {
        let _g = DisableInterrupts::new();
        with(|s| {
            let t = s.threads.get_mut(&cur).expect("current thread missing");
            t.state = ThreadState::Sleep;
            t.wait_channel = Some(q.id());
            s.queues.get_mut(&q.id()).expect("unknown queue").push_back(cur);
        });
    }
    switch();
}

/// Put the current thread to sleep on `q`, cancellably. Returns `Err(EINTR)`
/// immediately (without touching `q`) if already cancelled, and again after
/// waking if cancellation arrived while asleep.
pub fn cancellable_sleep_on(q: Queue) -> Result<(), Errno> {
    let cur = current_thread_id();
    let already_cancelled = with(|s| s.threads.get(&cur).map(|t| t.cancelled).unwrap_or(false));
    if already_cancelled {
        return Err(Errno::EINTR);
    }
    {
        let _g = DisableInterrupts::new();
        with(|s| {
            let t = s.threads.get_mut(&cur).expect("current thread missing");
            t.state = ThreadState::SleepCancellable;
            t.wait_channel = Some(q.id());
            s.queues.get_mut(&q.id()).expect("unknown queue").push_back(cur);
        });
    }
    switch();
    let cancelled = with(|s| s.threads.get(&cur).map(|t| t.cancelled).unwrap_or(false));
    if cancelled {
        Err(Errno::EINTR)
    } else {
        Ok(())
    }
}

/// Wake the oldest waiter on `q`, moving it to the run queue. Returns the
/// woken thread, or `None` if `q` was empty. Safe to call from interrupt
/// context.
pub fn wakeup_on(q: Queue) -> Option<ThreadId> {
    let _g = DisableInterrupts::new();
    with(|s| {
        let tid = s.queues.get_mut(&q.id()).expect("unknown queue").pop_front()?;
        let t = s.threads.get_mut(&tid).expect("queued thread missing");
        debug_assert!(
            t.state == ThreadState::Sleep || t.state == ThreadState::SleepCancellable,
            "waking a thread that was not asleep"
        );
        t.state = ThreadState::Running;
        t.wait_channel = Some(queue::RUN_QUEUE_ID);
        s.run_queue().push_back(tid);
        Some(tid)
    })
}

/// Wake every waiter currently on `q`.
pub fn broadcast_on(q: Queue) {
    while wakeup_on(q).is_some() {}
}

/// Set `tid`'s cancellation flag. If it is currently SLEEP_CANCELLABLE, pull
/// it off whatever queue it is on (named by its own `wait_channel`) and move
/// it straight to the run queue. If it is NO_STATE or EXITED, there is
/// nothing more to do; in plain SLEEP the flag is simply observed at the
/// thread's next cancellable suspension point.
pub fn cancel(tid: ThreadId) {
    let _g = DisableInterrupts::new();
    with(|s| {
        let Some(t) = s.threads.get_mut(&tid) else { return };
        t.cancelled = true;
        if t.state == ThreadState::SleepCancellable {
            let qid = t.wait_channel.expect("cancellable sleeper with no wait channel");
            if let Some(q) = s.queues.get_mut(&qid) {
                if let Some(pos) = q.iter().position(|&x| x == tid) {
                    q.remove(pos);
                    let t = s.threads.get_mut(&tid).unwrap();
                    t.state = ThreadState::Running;
                    t.wait_channel = Some(queue::RUN_QUEUE_ID);
                    s.run_queue().push_back(tid);
                }
            }
        }
    });
}

/// Precondition: `tid` is not already on the run queue.
pub fn make_runnable(tid: ThreadId) {
    let _g = DisableInterrupts::new();
    with(|s| {
        let t = s.threads.get_mut(&tid).expect("unknown thread");
        debug_assert!(t.wait_channel != Some(queue::RUN_QUEUE_ID));
        t.state = ThreadState::Running;
        t.wait_channel = Some(queue::RUN_QUEUE_ID);
        s.run_queue().push_back(tid);
    });
}

/// Seed the current-thread global before the first call to `switch`. Used
/// once at boot to make the idle thread "current" without having gone
/// through the run queue.
pub fn bootstrap_current(tid: ThreadId) {
    with(|s| s.current = Some(tid));
}

/// Dispatch the next runnable thread. Busy-waits at IPL_LOW (`hlt`) while
/// the run queue is empty, mirroring `intr_wait`.
pub fn switch() {
    interrupts::disable();
    loop {
        let next = with(|s| s.run_queue().pop_front());
        match next {
            Some(next_tid) => {
                let prev = with(|s| s.current.replace(next_tid));
                match prev {
                    Some(prev_tid) if prev_tid != next_tid => context_switch(prev_tid, next_tid),
                    None => context_switch(next_tid, next_tid),
                    _ => {}
                }
                interrupts::enable();
                return;
            }
            None => {
                interrupts::enable();
                x86_64::instructions::hlt();
                interrupts::disable();
            }
        }
    }
}

/// Boundary hook standing in for the real register save/restore. Out of
/// scope for this core; real low-level code replaces this with an actual
/// context switch.
fn context_switch(prev: ThreadId, next: ThreadId) {
    log::trace!("sched: context switch {} -> {}", prev, next);
}

pub fn current_thread_id() -> ThreadId {
    with(|s| s.current.expect("no current thread"))
}

pub fn current_process_id() -> ProcessId {
    with(|s| {
        let cur = s.current.expect("no current thread");
        s.threads.get(&cur).expect("current thread missing").process_id
    })
}

pub fn state(tid: ThreadId) -> ThreadState {
    with(|s| {
        s.threads
            .get(&tid)
            .map(|t| t.state)
            .unwrap_or(ThreadState::Exited)
    })
}

pub fn set_retval(tid: ThreadId, retval: i32) {
    with(|s| {
        if let Some(t) = s.threads.get_mut(&tid) {
            t.retval = retval;
        }
    });
}

pub fn retval(tid: ThreadId) -> i32 {
    with(|s| s.threads.get(&tid).map(|t| t.retval).unwrap_or(0))
}

pub fn is_cancelled(tid: ThreadId) -> bool {
    with(|s| s.threads.get(&tid).map(|t| t.cancelled).unwrap_or(false))
}

/// Mark a thread EXITED with no wait channel, asserting the invariants
/// `kthread_exit` relies on (not queued, owned by the caller's process).
pub fn mark_exited(tid: ThreadId, retval: i32) {
    let _g = DisableInterrupts::new();
    with(|s| {
        let t = s.threads.get_mut(&tid).expect("unknown thread");
        debug_assert!(t.wait_channel.is_none() || t.wait_channel == Some(queue::RUN_QUEUE_ID));
        t.retval = retval;
        t.state = ThreadState::Exited;
        t.wait_channel = None;
    });
}

pub fn thread_count() -> usize {
    with(|s| s.threads.len())
}

/// Place `tid` directly into SLEEP on `q`'s wait list, bypassing `sleep_on`.
/// Test-only: a unit test has no second execution context to actually park
/// a thread in `sleep_on`'s blocking path, so callers that need to simulate
/// contention (e.g. `sync::mutex`'s FIFO-handoff test) use this to get a
/// thread into the state `unlock`'s `wakeup_on` expects to find it in.
#[cfg(test)]
pub fn test_mark_sleeping(tid: ThreadId, q: Queue) {
    let _g = DisableInterrupts::new();
    with(|s| {
        let t = s.threads.get_mut(&tid).expect("unknown thread");
        t.state = ThreadState::Sleep;
        t.wait_channel = Some(q.id());
        s.queues.get_mut(&q.id()).expect("unknown queue").push_back(tid);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_alloc_and_fifo_via_public_api() {
        init();
        let pid = ProcessId::new(42);
        let a = create_thread(pid, "a");
        let b = create_thread(pid, "b");
        let c = create_thread(pid, "c");
        let q = queue_init();
        // Directly drive the internal queue table through the public wake
        // path: enqueue order a, b, c; wake order must match (FIFO).
        with(|s| {
            s.threads.get_mut(&a).unwrap().state = ThreadState::Sleep;
            s.threads.get_mut(&a).unwrap().wait_channel = Some(q.id());
            s.queues.get_mut(&q.id()).unwrap().push_back(a);
            s.threads.get_mut(&b).unwrap().state = ThreadState::Sleep;
            s.threads.get_mut(&b).unwrap().wait_channel = Some(q.id());
            s.queues.get_mut(&q.id()).unwrap().push_back(b);
            s.threads.get_mut(&c).unwrap().state = ThreadState::Sleep;
            s.threads.get_mut(&c).unwrap().wait_channel = Some(q.id());
            s.queues.get_mut(&q.id()).unwrap().push_back(c);
        });
        assert_eq!(wakeup_on(q), Some(a));
        assert_eq!(wakeup_on(q), Some(b));
        assert_eq!(wakeup_on(q), Some(c));
        assert_eq!(wakeup_on(q), None);
    }
}
