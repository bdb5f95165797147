/*
 * Name Resolution: lookup / dir_namev / open_namev
 *
 * Grounded on `kernel/fs/namev.c` in full: the leading-slash collapse, the
 * "empty path after root/base" special case (equivalent to "."), the
 * `NAME_LEN` component-length check, and the check-then-create atomicity
 * `open_namev` gets from a dedicated lookup-create mutex (`lookup_mutex`
 * there, `OPEN_NAMEV_LOCK` here).
 *
 * `dir_namev`'s `*name`/`*namelen` out-parameters point into the caller's
 * path buffer in the source; here the last path component is returned as an
 * owned `String` slice instead; a caller that needs to avoid the allocation
 * can still borrow the original path for the same span. Vnode refcounting
 * is structural: every `VnodeRef` (`Arc`) returned here is already "held"
 * by construction, and the caller's eventual drop is the release the spec
 * calls `vput`.
 */

use crate::config::NAME_LEN;
use crate::fs::vnode::VnodeRef;
use crate::io::device::Errno;
use crate::sync::KMutex;
use alloc::string::{String, ToString};
use lazy_static::lazy_static;
use spin::Mutex;

static VFS_ROOT: Mutex<Option<VnodeRef>> = Mutex::new(None);

lazy_static! {
    /// Serializes `open_namev`'s lookup-then-create window against concurrent
    /// creators, exactly as `lookup_mutex` does in the source.
    static ref OPEN_NAMEV_LOCK: KMutex = KMutex::new();
}

/// Install the filesystem root. Must be called once during VFS init, before
/// any path beginning with `/` is resolved.
pub fn set_root(root: VnodeRef) {
    *VFS_ROOT.lock() = Some(root);
}

pub fn root() -> VnodeRef {
    VFS_ROOT.lock().as_ref().expect("vfs root not mounted").clone()
}

/// Whether the VFS has been mounted yet (`set_root` called). Used by
/// `process::proc_create` to decide whether a newly created process should
/// get a CWD at all: the idle process is created before the VFS exists and
/// has none.
pub fn has_root() -> bool {
    VFS_ROOT.lock().is_some()
}

/// `lookup(dir, name) -> 0 | -ENOTDIR | -ENOENT | -ENAMETOOLONG`.
///
/// `name == ""` returns `dir` itself (refcount incremented via `Arc`
/// clone), equivalent to the source's "." special case. `dir.lookup` being
/// absent is handled by `Vnode`'s default implementation, which already
/// returns `ENOTDIR` -- the "absent lookup means not a directory"
/// convention from the vtable doc.
pub fn lookup(dir: &VnodeRef, name: &str) -> Result<VnodeRef, Errno> {
    if name.is_empty() {
        return Ok(dir.clone());
    }
    if name.len() > NAME_LEN {
        return Err(Errno::ENAMETOOLONG);
    }
    dir.lookup(name)
}

/// Result of `dir_namev`: the resolved parent directory plus the unresolved
/// basename of the original path.
pub struct DirNamev {
    pub parent: VnodeRef,
    pub name: String,
}

/// `dir_namev(path, base) -> DirNamev | -EINVAL | -ENOENT | -ENOTDIR |
/// -ENAMETOOLONG`.
///
/// `base` is the starting vnode for relative paths; `None` means
/// `curproc`'s cwd. Trailing slashes after the final component are
/// consumed here; whether the final component must then be a directory is
/// left to the caller, per the source.
pub fn dir_namev(path: &str, base: Option<&VnodeRef>) -> Result<DirNamev, Errno> {
    if path.is_empty() {
        return Err(Errno::EINVAL);
    }

    let absolute = path.starts_with('/');
    let mut cur = if absolute {
        root()
    } else if let Some(b) = base {
        b.clone()
    } else {
        crate::process::with_process(crate::process::current(), |p| p.cwd.clone())
            .flatten()
            .unwrap_or_else(root)
    };

    // Collapse leading slashes (and, by construction below, every run of
    // internal slashes as components are split on '/').
    let rest = path.trim_start_matches('/');
    // Trailing slashes are consumed; they only assert "this must be a
    // directory", which callers enforce themselves.
    let rest = rest.trim_end_matches('/');

    if rest.is_empty() {
        // "/" or "" relative to base: the path names the starting vnode
        // itself.
        return Ok(DirNamev {
            parent: cur,
            name: ".".to_string(),
        });
    }

    let mut components: alloc::vec::Vec<&str> = rest.split('/').collect();
    // Internal multiple slashes collapse to one: split on '/' then drop any
    // empty components produced by "//"; this does not change interpretation
    // of the (already-trimmed) leading/trailing runs.
    components.retain(|c| !c.is_empty());
    if components.is_empty() {
        return Ok(DirNamev {
            parent: cur,
            name: ".".to_string(),
        });
    }

    let last_index = components.len() - 1;
    for (i, component) in components.iter().enumerate() {
        if component.len() > NAME_LEN {
            return Err(Errno::ENAMETOOLONG);
        }
        if i == last_index {
            return Ok(DirNamev {
                parent: cur,
                name: component.to_string(),
            });
        }
        cur = lookup(&cur, component)?;
    }

    unreachable!("last component always returns above")
}

/// `open_namev(path, flags, base) -> VnodeRef | -ENOENT | -EISDIR |
/// -ENOTDIR | -ENAMETOOLONG`.
///
/// `want_write` mirrors the spec's "caller requested write access" check
/// used to reject opening a directory for writing. The lookup-then-create
/// window is serialized by `OPEN_NAMEV_LOCK` so two concurrent
/// `O_CREAT`-ing opens of the same name cannot both win.
pub fn open_namev(
    path: &str,
    o_creat: bool,
    want_write: bool,
    base: Option<&VnodeRef>,
) -> Result<VnodeRef, Errno> {
    let resolved = dir_namev(path, base)?;
    let parent = resolved.parent;
    let name = resolved.name;

    OPEN_NAMEV_LOCK.lock();
    let result = (|| match lookup(&parent, &name) {
        Ok(vnode) => {
            if want_write && crate::io::device::S_ISDIR(vnode.mode()) {
                return Err(Errno::EISDIR);
            }
            Ok(vnode)
        }
        Err(Errno::ENOENT) if o_creat => parent.create(&name),
        Err(e) => Err(e),
    })();
    OPEN_NAMEV_LOCK.unlock();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ramfs::RamVnode;

    fn fixture() -> VnodeRef {
        let root = RamVnode::new_root();
        root.mkdir("a").unwrap();
        let a = root.lookup("a").unwrap();
        a.mkdir("b").unwrap();
        root
    }

    #[test]
    fn dir_namev_splits_parent_and_basename() {
        let root = fixture();
        let resolved = dir_namev("/a/b/c", Some(&root)).expect("dir_namev");
        let a = root.lookup("a").unwrap();
        let b = a.lookup("b").unwrap();
        assert_eq!(resolved.parent.ino(), b.ino());
        assert_eq!(resolved.name, "c");
        assert_eq!(lookup(&resolved.parent, "c").unwrap_err(), Errno::ENOENT);
    }

    #[test]
    fn dir_namev_collapses_internal_slashes() {
        let root = fixture();
        let resolved = dir_namev("/a//b///c", Some(&root)).expect("dir_namev");
        assert_eq!(resolved.name, "c");
    }

    #[test]
    fn empty_path_is_einval() {
        let root = fixture();
        assert_eq!(dir_namev("", Some(&root)).unwrap_err(), Errno::EINVAL);
    }

    #[test]
    fn root_path_resolves_to_dot() {
        let root = fixture();
        let resolved = dir_namev("/", Some(&root)).expect("dir_namev");
        assert_eq!(resolved.parent.ino(), root.ino());
        assert_eq!(resolved.name, ".");
    }

    #[test]
    fn open_namev_creates_on_enoent_with_o_creat() {
        let root = fixture();
        let created = open_namev("/a/newfile", true, true, Some(&root)).expect("create");
        let looked_up = root.lookup("a").unwrap().lookup("newfile").expect("lookup");
        assert_eq!(created.ino(), looked_up.ino());
    }

    #[test]
    fn open_namev_without_o_creat_propagates_enoent() {
        let root = fixture();
        assert_eq!(
            open_namev("/a/missing", false, false, Some(&root)).unwrap_err(),
            Errno::ENOENT
        );
    }

    #[test]
    fn open_namev_rejects_directory_write() {
        let root = fixture();
        assert_eq!(
            open_namev("/a", false, true, Some(&root)).unwrap_err(),
            Errno::EISDIR
        );
    }
}
