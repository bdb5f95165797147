/*
 * Process Lifecycle
 *
 * Grounded on `kernel/proc/proc.c` and `kernel/proc/kthread.c`. Owns the
 * global process table, PID allocation, the parent/child graph, and the
 * create -> run -> cleanup -> zombie -> reap state machine. Threads
 * themselves (ids, state, queues) live in `sched`; this module is what
 * creates and destroys them on a process's behalf and orchestrates
 * `waitpid`/`exit`/kill.
 */

use crate::config::{NFILES, PID_IDLE, PID_INIT, PROC_MAX_COUNT, PROC_NAME_LEN};
use crate::fs::file::FdTable;
use crate::fs::vnode::VnodeRef;
use crate::io::device::Errno;
use crate::memory::address_space::AddressSpace;
use crate::sched::{self, Queue, ThreadId, ThreadState};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub usize);

impl ProcessId {
    pub const fn new(id: usize) -> Self {
        Self(id)
    }
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Dead,
}

pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub parent: Option<ProcessId>,
    pub children: Vec<ProcessId>,
    pub threads: Vec<ThreadId>,
    pub state: ProcessState,
    pub exit_status: i32,
    pub wait_queue: Queue,
    pub fd_table: FdTable,
    pub cwd: Option<VnodeRef>,
    pub address_space: AddressSpace,
}

impl Process {
    pub fn is_zombie(&self) -> bool {
        self.state == ProcessState::Dead
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("state", &self.state)
            .finish()
    }
}

struct ProcessTable {
    procs: BTreeMap<ProcessId, Process>,
    next_pid: usize,
    init_proc: Option<ProcessId>,
}

impl ProcessTable {
    fn new() -> Self {
        Self {
            procs: BTreeMap::new(),
            next_pid: 0,
            init_proc: None,
        }
    }

    /// Monotonic counter modulo `PROC_MAX_COUNT`, skipping PIDs already
    /// present. `-1` (here: `None`) if the table is full.
    fn alloc_pid(&mut self) -> Option<usize> {
        for _ in 0..PROC_MAX_COUNT {
            let candidate = self.next_pid;
            self.next_pid = (self.next_pid + 1) % PROC_MAX_COUNT;
            if !self.procs.contains_key(&ProcessId(candidate)) {
                return Some(candidate);
            }
        }
        None
    }
}

static TABLE: Mutex<Option<ProcessTable>> = Mutex::new(None);

fn with<R>(f: impl FnOnce(&mut ProcessTable) -> R) -> R {
    let mut guard = TABLE.lock();
    let t = guard.as_mut().expect("process::init not called");
    f(t)
}

pub fn init() {
    *TABLE.lock() = Some(ProcessTable::new());
    log::info!("process: table initialized");
}

/// `proc_create`. `curproc` is read internally (via `sched::current_process_id`)
/// except when called to create PID 0, before any thread has run.
fn proc_create(name: &str, parent: Option<ProcessId>) -> Result<ProcessId, Errno> {
    with(|t| {
        let pid = t.alloc_pid().ok_or(Errno::ENOMEM)?;
        debug_assert!(
            pid != PID_IDLE || t.procs.is_empty(),
            "PID 0 must be the first process created"
        );
        debug_assert!(
            pid != PID_INIT || parent == Some(ProcessId(PID_IDLE)),
            "PID 1 must be created with idle as curproc"
        );
        let id = ProcessId(pid);
        let mut truncated = name.to_string();
        truncated.truncate(PROC_NAME_LEN);

        // "If VFS is active, ... for non-early processes, inherit parent's
        // CWD" (spec §4.3). The idle process is always created before the
        // VFS is mounted and gets no CWD; every process created afterward
        // inherits its parent's CWD, falling back to the filesystem root if
        // the parent has none (e.g. idle itself).
        let cwd = if crate::fs::namev::has_root() {
            let inherited = parent.and_then(|p| t.procs.get(&p).and_then(|pp| pp.cwd.clone()));
            Some(inherited.unwrap_or_else(crate::fs::namev::root))
        } else {
            None
        };

        let proc = Process {
            id,
            name: truncated,
            parent,
            children: Vec::new(),
            threads: Vec::new(),
            state: ProcessState::Running,
            exit_status: 0,
            wait_queue: sched::queue_init(),
            fd_table: FdTable::new(),
            cwd,
            address_space: AddressSpace::new_kernel(),
        };
        t.procs.insert(id, proc);

        if let Some(parent_id) = parent {
            if pid != 0 {
                if let Some(p) = t.procs.get_mut(&parent_id) {
                    p.children.push(id);
                }
            }
        }
        if pid == PID_INIT {
            t.init_proc = Some(id);
        }
        Ok(id)
    })
}

/// Create the idle process (PID 0). Must be the very first process created.
pub fn create_idle() -> ProcessId {
    proc_create("idle", None).expect("idle process creation must succeed")
}

/// Create a new process as a child of `curproc`.
pub fn proc_create_child(name: &str) -> Result<ProcessId, Errno> {
    let parent = sched::current_process_id();
    proc_create(name, Some(parent))
}

/// `kthread_create` + linkage: create a thread under `pid` and run it.
pub fn spawn_thread(pid: ProcessId, name: &str) -> ThreadId {
    let tid = sched::create_thread(pid, name);
    with(|t| {
        if let Some(p) = t.procs.get_mut(&pid) {
            p.threads.push(tid);
        }
    });
    sched::make_runnable(tid);
    tid
}

/// Create idle's thread and seed it as "current" directly, bypassing the
/// run queue: there is no prior thread to have switched from, so idle
/// never goes through `make_runnable`/`switch` to start running.
pub fn bootstrap_idle_thread(pid: ProcessId) -> ThreadId {
    let tid = sched::create_thread(pid, "idle");
    with(|t| {
        if let Some(p) = t.procs.get_mut(&pid) {
            p.threads.push(tid);
        }
    });
    sched::bootstrap_current(tid);
    tid
}

pub fn with_process<R>(pid: ProcessId, f: impl FnOnce(&Process) -> R) -> Option<R> {
    with(|t| t.procs.get(&pid).map(f))
}

pub fn with_process_mut<R>(pid: ProcessId, f: impl FnOnce(&mut Process) -> R) -> Option<R> {
    with(|t| t.procs.get_mut(&pid).map(f))
}

pub fn current() -> ProcessId {
    sched::current_process_id()
}

/// `do_exit(status)`: cancel every other thread of `curproc`, then exit the
/// calling thread. Does not return.
pub fn do_exit(status: i32) -> ! {
    let pid = current();
    let cur_tid = sched::current_thread_id();
    let others: Vec<ThreadId> = with_process(pid, |p| {
        p.threads.iter().copied().filter(|&t| t != cur_tid).collect()
    })
    .unwrap_or_default();
    for tid in others {
        sched::cancel(tid);
    }
    thread_exit(status)
}

/// `kthread_exit(retval)`. Never returns: `proc_thread_exited` abandons this
/// thread's stack once `switch()` inside it hands control elsewhere.
fn thread_exit(retval: i32) -> ! {
    let tid = sched::current_thread_id();
    debug_assert!(sched::state(tid) != ThreadState::Exited);
    sched::mark_exited(tid, retval);
    proc_thread_exited(retval);
    unreachable!("proc_thread_exited must not return");
}

/// `proc_thread_exited`: clean up the owning process, then switch away
/// permanently. In this single-thread-per-process core, this finishes the
/// process.
fn proc_thread_exited(status: i32) -> ! {
    proc_cleanup(status);
    loop {
        sched::switch();
    }
}

/// `proc_cleanup`. Preconditions: init exists, `curproc` is not idle, and
/// `curproc` has a parent.
fn proc_cleanup(status: i32) {
    let pid = current();
    debug_assert!(pid != ProcessId(PID_IDLE), "idle process cannot exit");

    let init = with(|t| t.init_proc.expect("init process does not exist"));
    let is_init = pid == init;

    let (children, parent) = with_process(pid, |p| (p.children.clone(), p.parent)).unwrap();
    debug_assert!(parent.is_some(), "non-idle process must have a parent");

    if is_init {
        for child in children {
            let _ = waitpid(child.as_usize() as i32, 0);
        }
    } else {
        for child in children {
            reparent(child, init);
        }
    }

    let fds_to_close: Vec<i32> = with_process_mut(pid, |p| {
        p.state = ProcessState::Dead;
        p.exit_status = status;
        (0..NFILES as i32)
            .filter(|&fd| p.fd_table.is_open(fd))
            .collect()
    })
    .unwrap_or_default();
    for fd in fds_to_close {
        let _ = crate::fs::syscall::do_close(pid, fd);
    }

    with_process_mut(pid, |p| p.cwd = None);

    let parent_wait = with_process(parent.unwrap(), |p| p.wait_queue).unwrap();
    sched::wakeup_on(parent_wait);
}

fn reparent(child: ProcessId, new_parent: ProcessId) {
    with(|t| {
        if let Some(c) = t.procs.get_mut(&child) {
            c.parent = Some(new_parent);
        }
        if let Some(np) = t.procs.get_mut(&new_parent) {
            np.children.push(child);
        }
    });
}

/// `proc_kill(p, status)`.
pub fn proc_kill(pid: ProcessId, status: i32) {
    if pid == current() {
        do_exit(status);
    }
    let threads = with_process(pid, |p| p.threads.clone()).unwrap_or_default();
    for tid in threads {
        sched::cancel(tid);
    }
    with_process_mut(pid, |p| p.exit_status = status);
}

/// `proc_kill_all`: kill every process whose parent is not idle, except the
/// caller, then exit the caller unless its parent is idle. Never kills a
/// direct child of idle.
pub fn proc_kill_all() {
    let idle = ProcessId(PID_IDLE);
    let caller = current();
    let victims: Vec<ProcessId> = with(|t| {
        t.procs
            .values()
            .filter(|p| p.parent != Some(idle) && p.id != caller)
            .map(|p| p.id)
            .collect()
    });
    for pid in victims {
        proc_kill(pid, 0);
    }
    let caller_parent = with_process(caller, |p| p.parent).flatten();
    if caller_parent != Some(idle) {
        do_exit(0);
    }
}

fn is_child(parent: ProcessId, pid: i32) -> bool {
    with_process(parent, |p| p.children.iter().any(|c| c.as_usize() as i32 == pid)).unwrap_or(false)
}

fn find_dead_child(parent: ProcessId, pid_filter: Option<i32>) -> Option<ProcessId> {
    with(|t| {
        let p = t.procs.get(&parent)?;
        p.children
            .iter()
            .copied()
            .find(|&c| {
                let matches_pid = pid_filter.map(|want| c.as_usize() as i32 == want).unwrap_or(true);
                matches_pid
                    && t.procs
                        .get(&c)
                        .map(|cp| cp.state == ProcessState::Dead)
                        .unwrap_or(false)
            })
    })
}

fn cleanup_child(parent: ProcessId, child: ProcessId) -> i32 {
    let (threads, status) = with_process(child, |p| (p.threads.clone(), p.exit_status)).unwrap();
    for tid in threads {
        sched::destroy_thread(tid);
    }
    with_process_mut(parent, |p| p.children.retain(|&c| c != child));
    with(|t| t.procs.remove(&child));
    status
}

/// `waitpid(pid, options, *status) -> pid_t | -ECHILD`. Only `options == 0`
/// is supported.
pub fn waitpid(pid: i32, options: i32) -> Result<(i32, i32), Errno> {
    debug_assert!(options == 0, "only options == 0 is supported");
    let parent = current();
    if pid < -1 {
        return Err(Errno::ECHILD);
    }
    let no_children = with_process(parent, |p| p.children.is_empty()).unwrap_or(true);
    if no_children {
        return Err(Errno::ECHILD);
    }

    if pid == -1 {
        loop {
            if let Some(child) = find_dead_child(parent, None) {
                let status = cleanup_child(parent, child);
                return Ok((child.as_usize() as i32, status));
            }
            let wq = with_process(parent, |p| p.wait_queue).unwrap();
            sched::cancellable_sleep_on(wq)?;
        }
    }

    if pid > 0 {
        if !is_child(parent, pid) {
            return Err(Errno::ECHILD);
        }
        loop {
            if let Some(child) = find_dead_child(parent, Some(pid)) {
                let status = cleanup_child(parent, child);
                return Ok((child.as_usize() as i32, status));
            }
            let wq = with_process(parent, |p| p.wait_queue).unwrap();
            sched::cancellable_sleep_on(wq)?;
        }
    }

    Err(Errno::ECHILD)
}

/// Test-only stand-in for `thread_exit`/`proc_thread_exited`: runs the same
/// `mark_exited` + `proc_cleanup` sequence but returns instead of looping on
/// `sched::switch()` forever, since a host test has no second thread for
/// that loop to ever hand control to. `curproc` must be the exiting
/// process's thread, set via `sched::bootstrap_current` beforehand.
#[cfg(test)]
pub fn test_exit_current(status: i32) {
    let tid = sched::current_thread_id();
    sched::mark_exited(tid, status);
    proc_cleanup(status);
}

/// Debug introspection: formats one process's lifecycle state, following
/// the original `proc_info` debug printer.
pub fn proc_info(pid: ProcessId) -> Option<String> {
    with_process(pid, |p| {
        alloc::format!(
            "pid={} name={} parent={:?} children={:?} status={} state={:?}",
            p.id.0,
            p.name,
            p.parent.map(|x| x.0),
            p.children.iter().map(|c| c.0).collect::<Vec<_>>(),
            p.exit_status,
            p.state
        )
    })
}

pub fn proc_list_info() -> String {
    with(|t| {
        let mut out = String::new();
        for pid in t.procs.keys().copied().collect::<Vec<_>>() {
            if let Some(line) = proc_info(pid) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_allocation_skips_live_pids_without_a_queue() {
        // Exercises alloc_pid in isolation: insert bare entries at PIDs 0
        // and 2, leaving 1 free, and confirm it is the next allocation.
        let mut t = ProcessTable::new();
        for pid in [0usize, 2] {
            t.procs.insert(
                ProcessId(pid),
                Process {
                    id: ProcessId(pid),
                    name: "x".to_string(),
                    parent: None,
                    children: Vec::new(),
                    threads: Vec::new(),
                    state: ProcessState::Running,
                    exit_status: 0,
                    wait_queue: sched::Queue::reserved_for_tests(),
                    fd_table: FdTable::new(),
                    cwd: None,
                    address_space: AddressSpace::new_kernel(),
                },
            );
        }
        assert_eq!(t.alloc_pid(), Some(1));
    }
}
