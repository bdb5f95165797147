/*
 * S5: waitpid reaps a child's exit status.
 */

use super::fixture;
use crate::io::device::Errno;
use crate::process::{self, ProcessId};
use crate::sched;

/// The parent spawns a child, the child "exits" with status 7 (simulated via
/// `process::test_exit_current`, since this core's `switch()` never really
/// transfers control to a second call stack), and `waitpid(-1, 0)` reaps it
/// and returns its PID and status. A second `waitpid` call then sees no
/// children left and returns `ECHILD`.
#[test]
fn s5_waitpid_reaps_exited_child() {
    let parent_pid = fixture::boot();
    let parent_tid =
        process::with_process(parent_pid, |p| p.threads[0]).expect("parent thread");

    sched::bootstrap_current(parent_tid);
    let child_pid: ProcessId =
        process::proc_create_child("child").expect("create child");
    let child_tid = process::spawn_thread(child_pid, "child");

    sched::bootstrap_current(child_tid);
    process::test_exit_current(7);

    sched::bootstrap_current(parent_tid);
    let (reaped_pid, status) = process::waitpid(-1, 0).expect("waitpid reaps child");
    assert_eq!(reaped_pid, child_pid.as_usize() as i32);
    assert_eq!(status, 7);

    assert_eq!(process::waitpid(-1, 0).unwrap_err(), Errno::ECHILD);
}
