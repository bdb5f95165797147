/*
 * VFS Syscall Layer
 *
 * Grounded on `kernel/fs/open.c` and `kernel/fs/vfs_syscall.c` in full:
 * `do_open`, `do_read`, `do_write`, `do_close`, `do_dup`, `do_dup2`,
 * `do_lseek`, `do_mkdir`, `do_rmdir`, `do_unlink`, `do_mknod`, `do_link`,
 * `do_rename`, `do_chdir`, `do_stat`, `do_getdent`, plus `get_empty_fd`'s
 * lowest-free-index scan (delegated to `fs::file::FdTable`).
 *
 * Every function here takes the acting process's `ProcessId` explicitly
 * rather than reading a `curproc` global, so the syscall dispatcher can
 * resolve it once from `sched::current_process_id()` and thread it through.
 *
 * The five binding bug resolutions from the spec are applied at their call
 * sites below, each called out by what it does rather than the historical
 * defect: `do_open` forwards the caller's `oflags` unchanged, `do_stat`
 * returns the vnode op's own result, `do_write`'s append check is a single
 * `FileMode::APPEND` bit test, `do_chdir` tests the vnode's mode field, and
 * `do_rename` always links-then-unlinks in that order.
 */

use crate::fs::file::{FileHandle, FileMode, FileRef};
use crate::fs::namev::{self, dir_namev};
use crate::fs::vnode::VnodeRef;
use crate::io::device::{Errno, Stat, SEEK_CUR, SEEK_END, SEEK_SET, S_IFCHR, S_IFMT, S_ISDIR};
use crate::process::{Process, ProcessId};
use alloc::sync::Arc;
use spin::Mutex;

pub const O_ACCMODE: i32 = 0x3;
pub const O_RDONLY: i32 = 0x0;
pub const O_WRONLY: i32 = 0x1;
pub const O_RDWR: i32 = 0x2;
pub const O_CREAT: i32 = 0x100;
pub const O_TRUNC: i32 = 0x200;
pub const O_APPEND: i32 = 0x400;

/// Every function here acts on a live process (`pid` is always `curproc` in
/// practice, passed explicitly rather than read from a global); a missing
/// process table entry is a caller bug, not a runtime condition to report as
/// an errno.
fn with_proc<R>(pid: ProcessId, f: impl FnOnce(&Process) -> R) -> R {
    crate::process::with_process(pid, f).expect("syscall acting on a dead or unknown process")
}

fn with_proc_mut<R>(pid: ProcessId, f: impl FnOnce(&mut Process) -> R) -> R {
    crate::process::with_process_mut(pid, f).expect("syscall acting on a dead or unknown process")
}

fn resolve_base(pid: ProcessId) -> Option<VnodeRef> {
    with_proc(pid, |p| p.cwd.clone())
}

fn fget(pid: ProcessId, fd: i32) -> Result<FileRef, Errno> {
    with_proc(pid, |p| p.fd_table.get(fd))
}

/// Access-bit validation + `FileMode` mapping shared by `do_open`: exactly
/// one of RDONLY/WRONLY/RDWR, `O_APPEND` contributing the APPEND bit.
fn mode_from_oflags(oflags: i32) -> Result<FileMode, Errno> {
    let mode = match oflags & O_ACCMODE {
        O_RDONLY => FileMode::READ,
        O_WRONLY => FileMode::WRITE,
        O_RDWR => FileMode::READ | FileMode::WRITE,
        _ => return Err(Errno::EINVAL),
    };
    Ok(if oflags & O_APPEND != 0 {
        mode | FileMode::APPEND
    } else {
        mode
    })
}

/// `do_open(path, oflags)`. The caller's `oflags` are passed through to
/// `open_namev` exactly as received -- never overwritten to `O_CREAT`.
pub fn do_open(pid: ProcessId, path: &str, oflags: i32) -> Result<i32, Errno> {
    let mode = mode_from_oflags(oflags)?;
    let fd = with_proc(pid, |p| p.fd_table.get_empty_fd())?;
    let base = resolve_base(pid);

    let vnode = namev::open_namev(
        path,
        oflags & O_CREAT != 0,
        mode.contains(FileMode::WRITE),
        base.as_ref(),
    )?;

    let pos = if mode.contains(FileMode::APPEND) {
        vnode.len()
    } else {
        0
    };

    let handle: FileRef = Arc::new(Mutex::new(FileHandle { vnode, mode, pos }));
    with_proc_mut(pid, |p| p.fd_table.install(fd, handle))?;
    Ok(fd)
}

/// `do_read(fd, buf)`.
pub fn do_read(pid: ProcessId, fd: i32, buf: &mut [u8]) -> Result<usize, Errno> {
    let handle = fget(pid, fd)?;
    let mut h = handle.lock();
    if !h.mode.contains(FileMode::READ) {
        return Err(Errno::EBADF);
    }
    let n = h.vnode.read(h.pos, buf)?;
    h.pos += n as u64;
    Ok(n)
}

/// `do_write(fd, buf)`. Append mode seeks to the vnode's current length
/// first -- gated on `FileMode::APPEND` specifically, never a mask that is
/// unconditionally nonzero.
pub fn do_write(pid: ProcessId, fd: i32, buf: &[u8]) -> Result<usize, Errno> {
    let handle = fget(pid, fd)?;
    let mut h = handle.lock();
    if !h.mode.contains(FileMode::WRITE) {
        return Err(Errno::EBADF);
    }
    if h.mode.contains(FileMode::APPEND) {
        h.pos = h.vnode.len();
    }
    let n = h.vnode.write(h.pos, buf)?;
    h.pos += n as u64;
    Ok(n)
}

/// `do_close(fd)`.
pub fn do_close(pid: ProcessId, fd: i32) -> Result<(), Errno> {
    with_proc_mut(pid, |p| p.fd_table.close(fd))
}

/// `do_dup(fd)`: install an additional reference to the same handle at a
/// fresh descriptor.
pub fn do_dup(pid: ProcessId, fd: i32) -> Result<i32, Errno> {
    let handle = fget(pid, fd)?;
    let newfd = with_proc(pid, |p| p.fd_table.get_empty_fd())?;
    with_proc_mut(pid, |p| p.fd_table.install(newfd, handle))?;
    Ok(newfd)
}

/// `do_dup2(ofd, nfd)`.
pub fn do_dup2(pid: ProcessId, ofd: i32, nfd: i32) -> Result<i32, Errno> {
    let handle = fget(pid, ofd)?;
    if ofd == nfd {
        return Ok(ofd);
    }
    if with_proc(pid, |p| p.fd_table.is_open(nfd)) {
        do_close(pid, nfd)?;
    }
    with_proc_mut(pid, |p| p.fd_table.install(nfd, handle))?;
    Ok(nfd)
}

/// `do_lseek(fd, offset, whence)`.
pub fn do_lseek(pid: ProcessId, fd: i32, offset: i64, whence: i32) -> Result<i64, Errno> {
    let handle = fget(pid, fd)?;
    let mut h = handle.lock();
    let base = match whence {
        SEEK_SET => 0,
        SEEK_CUR => h.pos as i64,
        SEEK_END => h.vnode.len() as i64,
        _ => return Err(Errno::EINVAL),
    };
    let new_pos = base
        .checked_add(offset)
        .filter(|p| *p >= 0)
        .ok_or(Errno::EINVAL)?;
    h.pos = new_pos as u64;
    Ok(new_pos)
}

/// `do_mkdir(path)`.
pub fn do_mkdir(pid: ProcessId, path: &str) -> Result<(), Errno> {
    let base = resolve_base(pid);
    let resolved = dir_namev(path, base.as_ref())?;
    resolved.parent.mkdir(&resolved.name)?;
    Ok(())
}

/// `do_mknod(path, mode, devid)`. Only `S_IFCHR` device nodes are accepted;
/// this core has no block-device concept.
pub fn do_mknod(pid: ProcessId, path: &str, mode: u32, devid: u32) -> Result<(), Errno> {
    if mode & S_IFMT != S_IFCHR {
        return Err(Errno::EINVAL);
    }
    let base = resolve_base(pid);
    let resolved = dir_namev(path, base.as_ref())?;
    resolved.parent.mknod(&resolved.name, mode, devid)?;
    Ok(())
}

/// `do_rmdir(path)`. Rejects a final component of "." (`EINVAL`) and ".."
/// (`ENOTEMPTY`), exactly as the spec requires.
pub fn do_rmdir(pid: ProcessId, path: &str) -> Result<(), Errno> {
    let base = resolve_base(pid);
    let resolved = dir_namev(path, base.as_ref())?;
    if resolved.name == "." {
        return Err(Errno::EINVAL);
    }
    if resolved.name == ".." {
        return Err(Errno::ENOTEMPTY);
    }
    resolved.parent.rmdir(&resolved.name)
}

/// `do_unlink(path)`.
pub fn do_unlink(pid: ProcessId, path: &str) -> Result<(), Errno> {
    let base = resolve_base(pid);
    let resolved = dir_namev(path, base.as_ref())?;
    resolved.parent.unlink(&resolved.name)
}

/// `do_link(from, to)`: `to` must not yet exist; its parent must resolve.
pub fn do_link(pid: ProcessId, from: &str, to: &str) -> Result<(), Errno> {
    let base = resolve_base(pid);
    let target = namev::open_namev(from, false, false, base.as_ref())?;
    let resolved = dir_namev(to, base.as_ref())?;
    resolved.parent.link(&resolved.name, &target)
}

/// `do_rename(old, new)`: always `link(old, new)` then `unlink(old)`, in
/// that order -- never the reverse.
pub fn do_rename(pid: ProcessId, old: &str, new: &str) -> Result<(), Errno> {
    do_link(pid, old, new)?;
    do_unlink(pid, old)
}

/// `do_chdir(path)`. "Is a directory" is tested against the vnode's mode
/// field, never the presence of an unrelated vtable entry such as `mkdir`.
pub fn do_chdir(pid: ProcessId, path: &str) -> Result<(), Errno> {
    let base = resolve_base(pid);
    let vnode = namev::open_namev(path, false, false, base.as_ref())?;
    if !S_ISDIR(vnode.mode()) {
        return Err(Errno::ENOTDIR);
    }
    with_proc_mut(pid, |p| p.cwd = Some(vnode));
    Ok(())
}

/// `do_stat(path, *buf)`. Returns the vnode operation's own result, not the
/// name-resolution result code.
pub fn do_stat(pid: ProcessId, path: &str) -> Result<Stat, Errno> {
    let base = resolve_base(pid);
    let vnode = namev::open_namev(path, false, false, base.as_ref())?;
    vnode.stat()
}

/// `do_fstat(fd, *buf)`: the open-descriptor counterpart of `do_stat`, used
/// by `fstat`/`isatty`.
pub fn do_fstat(pid: ProcessId, fd: i32) -> Result<Stat, Errno> {
    let handle = fget(pid, fd)?;
    let h = handle.lock();
    h.vnode.stat()
}

/// `do_getdent(fd, *dirent)`: returns the entry at the handle's current
/// `f_pos`, advancing it by the delta `readdir` reports (`None` at end of
/// directory).
pub fn do_getdent(pid: ProcessId, fd: i32) -> Result<Option<crate::fs::vnode::DirEntry>, Errno> {
    let handle = fget(pid, fd)?;
    let mut h = handle.lock();
    match h.vnode.readdir(h.pos)? {
        None => Ok(None),
        Some((entry, delta)) => {
            h.pos += delta;
            Ok(Some(entry))
        }
    }
}

/// `waitpid(pid, options)`, exposed here for the syscall dispatcher's
/// convenience; the lifecycle logic itself lives in `process`.
pub fn do_waitpid(pid: i32, options: i32) -> Result<(i32, i32), Errno> {
    crate::process::waitpid(pid, options)
}

/// Install stdin/stdout/stderr (FDs 0-2) bound to `/dev/tty0`, the way the
/// boot sequence wires a freshly created process's console descriptors
/// before its first thread runs.
pub fn install_stdio(pid: ProcessId) -> Result<(), Errno> {
    let tty = namev::lookup(&namev::root().lookup("dev")?, "tty0")?;
    for fd in 0..3 {
        let handle: FileRef = Arc::new(Mutex::new(FileHandle {
            vnode: tty.clone(),
            mode: FileMode::READ | FileMode::WRITE,
            pos: 0,
        }));
        with_proc_mut(pid, |p| p.fd_table.install(fd, handle))?;
    }
    Ok(())
}
