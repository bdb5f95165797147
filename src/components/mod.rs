/*
 * User-facing Components
 *
 * Higher-level subsystems built on top of the drivers and console layer,
 * currently just the TTY line-discipline (`tty`).
 */

pub mod tty;
