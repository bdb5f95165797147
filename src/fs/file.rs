/*
 * File Handle and Per-process Descriptor Table
 *
 * Grounded on the teacher's `io::fd::FileDescriptorTable` (the
 * FD-to-device mapping and `dup`/`dup2`-via-shared-reference pattern),
 * generalized from a dynamically-growing `BTreeMap` to the fixed
 * `NFILES`-slot table the spec requires, and on
 * `kernel/fs/open.c`'s `get_empty_fd` (lowest free index, linear scan).
 *
 * A `FileHandle` bundles a vnode, an access-mode mask, and `f_pos`; it is
 * shared (`Arc<Mutex<_>>`) so that `dup`/`dup2` installing the same handle
 * at a second descriptor share one offset and one mode, exactly as the
 * spec's "a single F may be referenced by multiple FDs... lifetime =
 * longest holder" requires.
 */

use crate::config::NFILES;
use crate::io::device::Errno;
use crate::fs::vnode::VnodeRef;
use alloc::sync::Arc;
use bitflags::bitflags;
use spin::Mutex;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileMode: u32 {
        const READ = 0b001;
        const WRITE = 0b010;
        const APPEND = 0b100;
    }
}

pub struct FileHandle {
    pub vnode: VnodeRef,
    pub mode: FileMode,
    pub pos: u64,
}

pub type FileRef = Arc<Mutex<FileHandle>>;

pub struct FdTable {
    fds: [Option<FileRef>; NFILES],
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            fds: core::array::from_fn(|_| None),
        }
    }

    /// `get_empty_fd`: lowest-index free slot, `-EMFILE` if the table is
    /// full.
    pub fn get_empty_fd(&self) -> Result<i32, Errno> {
        self.fds
            .iter()
            .position(|f| f.is_none())
            .map(|i| i as i32)
            .ok_or(Errno::EMFILE)
    }

    pub fn is_open(&self, fd: i32) -> bool {
        self.slot(fd).map(|s| s.is_some()).unwrap_or(false)
    }

    fn slot(&self, fd: i32) -> Option<&Option<FileRef>> {
        if fd < 0 {
            return None;
        }
        self.fds.get(fd as usize)
    }

    fn slot_mut(&mut self, fd: i32) -> Option<&mut Option<FileRef>> {
        if fd < 0 {
            return None;
        }
        self.fds.get_mut(fd as usize)
    }

    pub fn get(&self, fd: i32) -> Result<FileRef, Errno> {
        self.slot(fd)
            .and_then(|s| s.clone())
            .ok_or(Errno::EBADF)
    }

    pub fn install(&mut self, fd: i32, handle: FileRef) -> Result<(), Errno> {
        let slot = self.slot_mut(fd).ok_or(Errno::EBADF)?;
        *slot = Some(handle);
        Ok(())
    }

    pub fn close(&mut self, fd: i32) -> Result<(), Errno> {
        let slot = self.slot_mut(fd).ok_or(Errno::EBADF)?;
        if slot.take().is_none() {
            return Err(Errno::EBADF);
        }
        Ok(())
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ramfs::RamVnode;

    fn handle() -> FileRef {
        Arc::new(Mutex::new(FileHandle {
            vnode: RamVnode::new_file(1, alloc::vec::Vec::new()),
            mode: FileMode::READ,
            pos: 0,
        }))
    }

    #[test]
    fn empty_fd_is_lowest_free_index() {
        let mut t = FdTable::new();
        t.install(0, handle()).unwrap();
        t.install(1, handle()).unwrap();
        assert_eq!(t.get_empty_fd(), Ok(2));
        t.close(0).unwrap();
        assert_eq!(t.get_empty_fd(), Ok(0));
    }

    #[test]
    fn full_table_reports_emfile() {
        let mut t = FdTable::new();
        for fd in 0..NFILES as i32 {
            t.install(fd, handle()).unwrap();
        }
        assert_eq!(t.get_empty_fd(), Err(Errno::EMFILE));
    }

    #[test]
    fn close_bad_fd_is_ebadf() {
        let mut t = FdTable::new();
        assert_eq!(t.close(5), Err(Errno::EBADF));
    }
}
