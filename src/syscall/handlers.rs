/*
 * System Call Handlers
 *
 * The Rust-side implementations dispatched to from `syscall_handler_rust`.
 * Each handler validates its userspace pointers, translates them into the
 * `fs::syscall`/`process` calls that do the real work, and folds the
 * `Result<_, Errno>` those return into the raw negative-on-error `isize`
 * the SYSCALL ABI expects.
 *
 * Security considerations:
 * - All userspace pointers MUST be validated before dereferencing
 * - File descriptors must be checked for validity
 * - Integer overflows must be prevented
 * - Resources must be properly cleaned up on error paths
 */

use super::numbers::*;
use crate::io::device::{Errno, Stat};
use crate::process;
use alloc::string::String;
use alloc::vec::Vec;

/// Validate a user pointer
///
/// Checks that a pointer from userspace is:
/// - Not NULL
/// - Within userspace address range (< 0x0000_8000_0000_0000)
/// - Does not overflow when adding count
///
/// Returns Ok(()) if valid, Err(error_code) otherwise.
fn validate_user_ptr<T>(ptr: *const T, count: usize) -> Result<(), isize> {
    let addr = ptr as usize;

    // Check for NULL pointer
    if addr == 0 {
        return Err(-EFAULT);
    }

    // Check if address is in kernel space (high half)
    if addr >= 0x0000_8000_0000_0000 {
        return Err(-EFAULT);
    }

    // Check for overflow when computing end address
    if addr.checked_add(count * core::mem::size_of::<T>()).is_none() {
        return Err(-EFAULT);
    }

    Ok(())
}

/// Longest path this core will copy in from userspace in one syscall.
/// Generous relative to `config::NAME_LEN` (a single component's bound):
/// a path is several components long.
const MAX_PATH: usize = 256;

/// Copy a NUL-terminated path string out of user memory.
///
/// This core has no separate user/kernel address space yet (`vm::pagefault`
/// notwithstanding -- there is no page-table swap on a syscall trap), so
/// "copy from user" is a bounds-checked read through the same mapping
/// rather than a cross-address-space copy. The check still matters: it is
/// what stops a wild pointer from walking off the end of mapped memory.
fn copy_user_path(ptr: *const u8) -> Result<String, isize> {
    validate_user_ptr(ptr, MAX_PATH)?;
    let mut bytes = Vec::with_capacity(MAX_PATH);
    for i in 0..MAX_PATH {
        let byte = unsafe { *ptr.add(i) };
        if byte == 0 {
            return String::from_utf8(bytes).map_err(|_| -EINVAL);
        }
        bytes.push(byte);
    }
    Err(-ENAMETOOLONG)
}

const ENAMETOOLONG: isize = 36;

fn errno_isize(e: Errno) -> isize {
    e.as_isize()
}

pub fn sys_read(fd: i32, buf: *mut u8, count: usize) -> isize {
    if let Err(e) = validate_user_ptr(buf, count) {
        return e;
    }
    let pid = process::current();
    let slice = unsafe { core::slice::from_raw_parts_mut(buf, count) };
    match crate::fs::syscall::do_read(pid, fd, slice) {
        Ok(n) => n as isize,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_write(fd: i32, buf: *const u8, count: usize) -> isize {
    if let Err(e) = validate_user_ptr(buf, count) {
        return e;
    }
    let pid = process::current();
    let slice = unsafe { core::slice::from_raw_parts(buf, count) };
    match crate::fs::syscall::do_write(pid, fd, slice) {
        Ok(n) => n as isize,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_open(path: *const u8, oflags: i32) -> isize {
    let path = match copy_user_path(path) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let pid = process::current();
    match crate::fs::syscall::do_open(pid, &path, oflags) {
        Ok(fd) => fd as isize,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_close(fd: i32) -> isize {
    let pid = process::current();
    match crate::fs::syscall::do_close(pid, fd) {
        Ok(()) => 0,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_dup(fd: i32) -> isize {
    let pid = process::current();
    match crate::fs::syscall::do_dup(pid, fd) {
        Ok(newfd) => newfd as isize,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_dup2(oldfd: i32, newfd: i32) -> isize {
    let pid = process::current();
    match crate::fs::syscall::do_dup2(pid, oldfd, newfd) {
        Ok(fd) => fd as isize,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_fstat(fd: i32, statbuf: *mut u8) -> isize {
    if let Err(e) = validate_user_ptr(statbuf, core::mem::size_of::<Stat>()) {
        return e;
    }
    let pid = process::current();
    match crate::fs::syscall::do_fstat(pid, fd) {
        Ok(stat) => {
            unsafe { (statbuf as *mut Stat).write(stat) };
            0
        }
        Err(e) => errno_isize(e),
    }
}

pub fn sys_stat(path: *const u8, statbuf: *mut u8) -> isize {
    if let Err(e) = validate_user_ptr(statbuf, core::mem::size_of::<Stat>()) {
        return e;
    }
    let path = match copy_user_path(path) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let pid = process::current();
    match crate::fs::syscall::do_stat(pid, &path) {
        Ok(stat) => {
            unsafe { (statbuf as *mut Stat).write(stat) };
            0
        }
        Err(e) => errno_isize(e),
    }
}

pub fn sys_lseek(fd: i32, offset: i64, whence: i32) -> isize {
    let pid = process::current();
    match crate::fs::syscall::do_lseek(pid, fd, offset, whence) {
        Ok(pos) => pos as isize,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_isatty(fd: i32) -> isize {
    let pid = process::current();
    match crate::fs::syscall::do_fstat(pid, fd) {
        Ok(stat) => {
            if crate::io::device::S_ISCHR(stat.st_mode) {
                1
            } else {
                0
            }
        }
        Err(e) => errno_isize(e),
    }
}

pub fn sys_mkdir(path: *const u8) -> isize {
    let path = match copy_user_path(path) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let pid = process::current();
    match crate::fs::syscall::do_mkdir(pid, &path) {
        Ok(()) => 0,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_rmdir(path: *const u8) -> isize {
    let path = match copy_user_path(path) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let pid = process::current();
    match crate::fs::syscall::do_rmdir(pid, &path) {
        Ok(()) => 0,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_unlink(path: *const u8) -> isize {
    let path = match copy_user_path(path) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let pid = process::current();
    match crate::fs::syscall::do_unlink(pid, &path) {
        Ok(()) => 0,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_mknod(path: *const u8, mode: u32, devid: u32) -> isize {
    let path = match copy_user_path(path) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let pid = process::current();
    match crate::fs::syscall::do_mknod(pid, &path, mode, devid) {
        Ok(()) => 0,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_link(from: *const u8, to: *const u8) -> isize {
    let from = match copy_user_path(from) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let to = match copy_user_path(to) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let pid = process::current();
    match crate::fs::syscall::do_link(pid, &from, &to) {
        Ok(()) => 0,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_rename(old: *const u8, new: *const u8) -> isize {
    let old = match copy_user_path(old) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let new = match copy_user_path(new) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let pid = process::current();
    match crate::fs::syscall::do_rename(pid, &old, &new) {
        Ok(()) => 0,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_chdir(path: *const u8) -> isize {
    let path = match copy_user_path(path) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let pid = process::current();
    match crate::fs::syscall::do_chdir(pid, &path) {
        Ok(()) => 0,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_getdents(fd: i32, entbuf: *mut u8, buflen: usize) -> isize {
    if let Err(e) = validate_user_ptr(entbuf, buflen) {
        return e;
    }
    let pid = process::current();
    match crate::fs::syscall::do_getdent(pid, fd) {
        Ok(Some(entry)) => {
            let name = entry.name.as_bytes();
            let needed = name.len() + 1;
            if needed > buflen {
                return -EINVAL;
            }
            unsafe {
                core::ptr::copy_nonoverlapping(name.as_ptr(), entbuf, name.len());
                *entbuf.add(name.len()) = 0;
            }
            needed as isize
        }
        Ok(None) => 0,
        Err(e) => errno_isize(e),
    }
}

pub fn sys_waitpid(pid: i32, status: *mut i32, options: i32) -> isize {
    if !status.is_null() {
        if let Err(e) = validate_user_ptr(status, 1) {
            return e;
        }
    }
    match crate::fs::syscall::do_waitpid(pid, options) {
        Ok((reaped_pid, exit_status)) => {
            if !status.is_null() {
                unsafe { *status = exit_status };
            }
            reaped_pid as isize
        }
        Err(e) => errno_isize(e),
    }
}

pub fn sys_brk(_addr: *mut u8) -> isize {
    // Heap growth is handled lazily by `vm::pagefault` on first touch past
    // the current break; there is no explicit break pointer to move here.
    -ENOSYS
}

pub fn sys_exit(status: i32) -> ! {
    process::do_exit(status)
}

pub fn sys_yield() -> isize {
    crate::sched::switch();
    0
}
