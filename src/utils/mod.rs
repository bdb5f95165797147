/*
 * Kernel Utilities and Support Functions
 *
 * This module groups the kernel's ambient support code: serial/console I/O
 * and its print macros (`io`), the boot-time logger (`debug`), timing and
 * power control (`system`), and the interactive shell (`ui`).
 */

pub mod debug;
pub mod io;
pub mod system;
pub mod ui;
