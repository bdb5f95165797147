/*
 * S6 / invariant 8: mutex handoff is FIFO, driven through the same
 * scheduler/process plumbing a real boot would use (as opposed to
 * `sync::mutex`'s own colocated unit test, which exercises the mutex in
 * isolation against bare thread ids with no process behind them).
 */

use super::fixture;
use crate::process;
use crate::sched;
use crate::sync::KMutex;

#[test]
fn s6_mutex_handoff_is_fifo_across_process_threads() {
    let pid = fixture::boot();

    let t0 = process::with_process(pid, |p| p.threads[0]).expect("test process thread");
    let t1 = process::spawn_thread(pid, "waiter-1");
    let t2 = process::spawn_thread(pid, "waiter-2");
    let t3 = process::spawn_thread(pid, "waiter-3");

    let m = KMutex::new();
    sched::bootstrap_current(t0);
    m.lock();
    assert_eq!(m.holder(), Some(t0));

    let waitq = m.waitq_for_test();
    for t in [t1, t2, t3] {
        sched::test_mark_sleeping(t, waitq);
    }

    sched::bootstrap_current(t0);
    m.unlock();
    assert_eq!(m.holder(), Some(t1));

    sched::bootstrap_current(t1);
    m.unlock();
    assert_eq!(m.holder(), Some(t2));

    sched::bootstrap_current(t2);
    m.unlock();
    assert_eq!(m.holder(), Some(t3));
}
