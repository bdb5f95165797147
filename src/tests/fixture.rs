/*
 * Test-only Boot Fixture
 *
 * Brings up `sched`/`process`/`fs` exactly as `main::kstart` does from its
 * "Step 10" onward, skipping the hardware-facing steps that precede it
 * there (GDT/IDT/memory/drivers/console) -- none of which this harness's
 * scenarios touch.
 */

use crate::process::ProcessId;

/// Fresh scheduler, process table, and mounted root ramfs, plus one extra
/// process (not idle, not init) with stdio already installed. Every S1-S5
/// scenario acts as this process.
pub fn boot() -> ProcessId {
    crate::sched::init();
    crate::process::init();
    let idle = crate::process::create_idle();
    crate::process::bootstrap_idle_thread(idle);

    crate::fs::init();

    let pid = crate::process::proc_create_child("test").expect("create test process");
    crate::process::spawn_thread(pid, "test");
    crate::fs::syscall::install_stdio(pid).expect("install test process stdio");
    pid
}
