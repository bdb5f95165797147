/*
 * In-memory Vnode Implementation (ramfs)
 *
 * Exercises the `Vnode` vtable end to end without a disk driver, the way
 * the spec's S5FS would for a real filesystem. Object model is vnode-based
 * (directories hold a map of name -> `VnodeRef`), unlike
 * `examples/Caya231-AtomicOS/src/fs/ramfs.rs`'s whole-path-string-keyed
 * `BTreeMap`, which was read only for secondary style inspiration.
 *
 * This is the concrete filesystem driver the spec calls an external
 * collaborator ("the concrete filesystem drivers... which provide
 * per-vnode operation tables"); it lives here because the core has no other
 * way to exercise `namev`/`open`/`read`/`write` without one.
 */

use crate::fs::vnode::{DirEntry, Vnode, VnodeRef};
use crate::io::device::{Device, Errno, Stat, S_IFCHR, S_IFDIR, S_IFREG};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

static NEXT_INO: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_ino() -> u64 {
    NEXT_INO.fetch_add(1, Ordering::Relaxed)
}

enum Kind {
    Dir(BTreeMap<String, VnodeRef>),
    File(Vec<u8>),
    Device(Arc<dyn Device>),
}

pub struct RamVnode {
    ino: u64,
    kind: Mutex<Kind>,
}

impl RamVnode {
    pub fn new_root() -> VnodeRef {
        Arc::new(Self {
            ino: next_ino(),
            kind: Mutex::new(Kind::Dir(BTreeMap::new())),
        })
    }

    pub fn new_dir(ino: u64) -> VnodeRef {
        Arc::new(Self {
            ino,
            kind: Mutex::new(Kind::Dir(BTreeMap::new())),
        })
    }

    pub fn new_file(ino: u64, data: Vec<u8>) -> VnodeRef {
        Arc::new(Self {
            ino,
            kind: Mutex::new(Kind::File(data)),
        })
    }

    pub fn new_device(ino: u64, dev: Arc<dyn Device>) -> VnodeRef {
        Arc::new(Self {
            ino,
            kind: Mutex::new(Kind::Device(dev)),
        })
    }
}

impl Vnode for RamVnode {
    fn ino(&self) -> u64 {
        self.ino
    }

    fn mode(&self) -> u32 {
        match &*self.kind.lock() {
            Kind::Dir(_) => S_IFDIR | 0o755,
            Kind::File(_) => S_IFREG | 0o644,
            Kind::Device(dev) => dev.stat().st_mode,
        }
    }

    fn len(&self) -> u64 {
        match &*self.kind.lock() {
            Kind::Dir(entries) => entries.len() as u64,
            Kind::File(data) => data.len() as u64,
            Kind::Device(dev) => dev.stat().st_size,
        }
    }

    fn stat(&self) -> Result<Stat, Errno> {
        let inner = self.kind.lock();
        Ok(match &*inner {
            Kind::Dir(entries) => Stat {
                st_mode: S_IFDIR | 0o755,
                st_size: entries.len() as u64,
                st_blksize: 512,
                st_blocks: 0,
            },
            Kind::File(data) => Stat {
                st_mode: S_IFREG | 0o644,
                st_size: data.len() as u64,
                st_blksize: 512,
                st_blocks: (data.len() as u64 + 511) / 512,
            },
            Kind::Device(dev) => dev.stat(),
        })
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize, Errno> {
        match &*self.kind.lock() {
            Kind::File(data) => {
                let offset = offset as usize;
                if offset >= data.len() {
                    return Ok(0);
                }
                let n = core::cmp::min(buf.len(), data.len() - offset);
                buf[..n].copy_from_slice(&data[offset..offset + n]);
                Ok(n)
            }
            Kind::Device(dev) => dev.read(buf),
            Kind::Dir(_) => Err(Errno::EISDIR),
        }
    }

    fn write(&self, offset: u64, buf: &[u8]) -> Result<usize, Errno> {
        match &mut *self.kind.lock() {
            Kind::File(data) => {
                let offset = offset as usize;
                if offset + buf.len() > data.len() {
                    data.resize(offset + buf.len(), 0);
                }
                data[offset..offset + buf.len()].copy_from_slice(buf);
                Ok(buf.len())
            }
            Kind::Device(dev) => dev.write(buf),
            Kind::Dir(_) => Err(Errno::EISDIR),
        }
    }

    fn lookup(&self, name: &str) -> Result<VnodeRef, Errno> {
        match &*self.kind.lock() {
            Kind::Dir(entries) => entries.get(name).cloned().ok_or(Errno::ENOENT),
            _ => Err(Errno::ENOTDIR),
        }
    }

    fn create(&self, name: &str) -> Result<VnodeRef, Errno> {
        match &mut *self.kind.lock() {
            Kind::Dir(entries) => {
                if entries.contains_key(name) {
                    return Err(Errno::EEXIST);
                }
                let child = RamVnode::new_file(next_ino(), Vec::new());
                entries.insert(name.to_string(), child.clone());
                Ok(child)
            }
            _ => Err(Errno::ENOTDIR),
        }
    }

    fn mkdir(&self, name: &str) -> Result<VnodeRef, Errno> {
        match &mut *self.kind.lock() {
            Kind::Dir(entries) => {
                if entries.contains_key(name) {
                    return Err(Errno::EEXIST);
                }
                let child = RamVnode::new_dir(next_ino());
                entries.insert(name.to_string(), child.clone());
                Ok(child)
            }
            _ => Err(Errno::ENOTDIR),
        }
    }

    fn mknod(&self, name: &str, mode: u32, devid: u32) -> Result<VnodeRef, Errno> {
        match &mut *self.kind.lock() {
            Kind::Dir(entries) => {
                if entries.contains_key(name) {
                    return Err(Errno::EEXIST);
                }
                if mode & crate::io::device::S_IFMT != S_IFCHR {
                    return Err(Errno::EINVAL);
                }
                let dev: Arc<dyn Device> = match devid {
                    1 => Arc::new(NullDevice),
                    2 => Arc::new(ZeroDevice),
                    _ => Arc::new(NullDevice),
                };
                let child = RamVnode::new_device(next_ino(), dev);
                entries.insert(name.to_string(), child.clone());
                Ok(child)
            }
            _ => Err(Errno::ENOTDIR),
        }
    }

    fn rmdir(&self, name: &str) -> Result<(), Errno> {
        match &mut *self.kind.lock() {
            Kind::Dir(entries) => {
                let target = entries.get(name).ok_or(Errno::ENOENT)?;
                if !crate::io::device::S_ISDIR(target.mode()) {
                    return Err(Errno::ENOTDIR);
                }
                if target.len() != 0 {
                    return Err(Errno::ENOTEMPTY);
                }
                entries.remove(name);
                Ok(())
            }
            _ => Err(Errno::ENOTDIR),
        }
    }

    fn unlink(&self, name: &str) -> Result<(), Errno> {
        match &mut *self.kind.lock() {
            Kind::Dir(entries) => {
                let target = entries.get(name).ok_or(Errno::ENOENT)?;
                if crate::io::device::S_ISDIR(target.mode()) {
                    return Err(Errno::EISDIR);
                }
                entries.remove(name);
                Ok(())
            }
            _ => Err(Errno::ENOTDIR),
        }
    }

    fn link(&self, name: &str, target: &VnodeRef) -> Result<(), Errno> {
        match &mut *self.kind.lock() {
            Kind::Dir(entries) => {
                if entries.contains_key(name) {
                    return Err(Errno::EEXIST);
                }
                entries.insert(name.to_string(), target.clone());
                Ok(())
            }
            _ => Err(Errno::ENOTDIR),
        }
    }

    fn readdir(&self, offset: u64) -> Result<Option<(DirEntry, u64)>, Errno> {
        match &*self.kind.lock() {
            Kind::Dir(entries) => {
                let entry = entries.iter().nth(offset as usize);
                Ok(entry.map(|(name, vn)| {
                    (
                        DirEntry {
                            name: name.clone(),
                            ino: vn.ino(),
                        },
                        1,
                    )
                }))
            }
            _ => Err(Errno::ENOTDIR),
        }
    }
}

/// `/dev/null`: discards writes, reads return EOF.
pub struct NullDevice;

impl Device for NullDevice {
    fn read(&self, _buf: &mut [u8]) -> Result<usize, Errno> {
        Ok(0)
    }
    fn write(&self, buf: &[u8]) -> Result<usize, Errno> {
        Ok(buf.len())
    }
    fn ioctl(&self, _request: u32, _arg: usize) -> Result<i32, Errno> {
        Err(Errno::ENOTTY)
    }
    fn stat(&self) -> Stat {
        Stat {
            st_mode: S_IFCHR | 0o666,
            st_size: 0,
            st_blksize: 0,
            st_blocks: 0,
        }
    }
}

/// `/dev/zero`: reads return an infinite stream of zero bytes.
pub struct ZeroDevice;

impl Device for ZeroDevice {
    fn read(&self, buf: &mut [u8]) -> Result<usize, Errno> {
        buf.fill(0);
        Ok(buf.len())
    }
    fn write(&self, buf: &[u8]) -> Result<usize, Errno> {
        Ok(buf.len())
    }
    fn ioctl(&self, _request: u32, _arg: usize) -> Result<i32, Errno> {
        Err(Errno::ENOTTY)
    }
    fn stat(&self) -> Stat {
        Stat {
            st_mode: S_IFCHR | 0o666,
            st_size: 0,
            st_blksize: 0,
            st_blocks: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_lookup_then_unlink() {
        let root = RamVnode::new_root();
        let created = root.create("f").expect("create");
        let found = root.lookup("f").expect("lookup after create");
        assert_eq!(found.ino(), created.ino());
        root.unlink("f").expect("unlink");
        assert_eq!(root.lookup("f").unwrap_err(), Errno::ENOENT);
    }

    #[test]
    fn mkdir_then_rmdir_requires_empty() {
        let root = RamVnode::new_root();
        root.mkdir("d").expect("mkdir");
        let d = root.lookup("d").expect("lookup dir");
        d.create("child").expect("create in subdir");
        assert_eq!(root.rmdir("d").unwrap_err(), Errno::ENOTEMPTY);
        d.unlink("child").expect("unlink child");
        root.rmdir("d").expect("rmdir now empty");
    }

    #[test]
    fn write_then_read_back() {
        let root = RamVnode::new_root();
        let f = root.create("f").unwrap();
        let n = f.write(0, b"hello").unwrap();
        assert_eq!(n, 5);
        let mut buf = [0u8; 5];
        let n = f.read(0, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
    }
}
