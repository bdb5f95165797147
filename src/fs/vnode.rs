/*
 * Vnode: the filesystem-agnostic in-memory inode
 *
 * Grounded on the vnode operation vtable exercised throughout
 * `kernel/fs/namev.c`, `open.c`, and `vfs_syscall.c` (`vn_ops->lookup`,
 * `->create`, `->mkdir`, `->rmdir`, `->mknod`, `->link`, `->unlink`,
 * `->read`, `->write`, `->readdir`, and the vnode-level `->stat`).
 *
 * Every operation below except `stat` has a default implementation
 * returning the errno the spec assigns to "this operation is absent for
 * this vnode" (`ENOTDIR` for the directory-shaped operations, `EISDIR` for
 * `read`/`write`). A filesystem vnode overrides exactly the operations that
 * make sense for it; the defaults give absence the meaning the spec
 * requires without a separate presence bitmask.
 *
 * Refcounting (`vget`/`vput` in the source) is simply `Arc` clone/drop here:
 * every function that hands out a `VnodeRef` increments the count by
 * construction, and the caller's eventual drop is the release. This is the
 * "scoped-release idiom" the spec calls for in place of hand-written
 * inc/dec pairs.
 */

use crate::io::device::{Errno, Stat};
use alloc::string::String;
use alloc::sync::Arc;

pub type VnodeRef = Arc<dyn Vnode>;

/// One entry produced by `readdir`.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub ino: u64,
}

pub trait Vnode: Send + Sync {
    /// Inode number, unique within this vnode's filesystem.
    fn ino(&self) -> u64;

    /// Type + permission bits (`S_IFDIR`, `S_IFREG`, `S_IFCHR`, ...).
    fn mode(&self) -> u32;

    /// Current length in bytes. Meaningless for non-seekable devices.
    fn len(&self) -> u64;

    /// The vnode-level stat operation. Always present: `do_stat` returns
    /// this result directly rather than the name-resolution result code.
    fn stat(&self) -> Result<Stat, Errno>;

    fn read(&self, _offset: u64, _buf: &mut [u8]) -> Result<usize, Errno> {
        Err(Errno::EISDIR)
    }

    fn write(&self, _offset: u64, _buf: &[u8]) -> Result<usize, Errno> {
        Err(Errno::EISDIR)
    }

    /// Absent lookup means "not a directory" per the spec.
    fn lookup(&self, _name: &str) -> Result<VnodeRef, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn create(&self, _name: &str) -> Result<VnodeRef, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn mkdir(&self, _name: &str) -> Result<VnodeRef, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn mknod(&self, _name: &str, _mode: u32, _devid: u32) -> Result<VnodeRef, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn rmdir(&self, _name: &str) -> Result<(), Errno> {
        Err(Errno::ENOTDIR)
    }

    fn unlink(&self, _name: &str) -> Result<(), Errno> {
        Err(Errno::ENOTDIR)
    }

    fn link(&self, _name: &str, _target: &VnodeRef) -> Result<(), Errno> {
        Err(Errno::ENOTDIR)
    }

    /// Returns the next entry at or after `offset` along with the byte
    /// delta `do_getdent` should advance `f_pos` by, or `None` at end of
    /// directory.
    fn readdir(&self, _offset: u64) -> Result<Option<(DirEntry, u64)>, Errno> {
        Err(Errno::ENOTDIR)
    }
}
