/*
 * Virtual File System
 *
 * The VFS layer: a filesystem-agnostic `Vnode` vtable (`vnode`), name
 * resolution over it (`namev`), the per-process file-descriptor table and
 * shared file handles (`file`), the syscall-facing operations built on top
 * (`syscall`), and an in-memory filesystem driver that exercises the whole
 * stack end to end (`ramfs`). `tar` is unrelated boundary machinery: it
 * reads the boot-time initrd archive, not a `Vnode` implementation.
 */

pub mod file;
pub mod namev;
pub mod ramfs;
pub mod syscall;
pub mod tar;
pub mod vnode;

pub use tar::TarReader;

use alloc::sync::Arc;

/// Mount the root ramfs and populate `/dev` with the null, zero, and tty0
/// device nodes, exactly as the spec's boot sequence prescribes
/// (`mkdir("/dev")` + `mknod(...)` for each special device).
pub fn init() {
    let root = ramfs::RamVnode::new_root();
    namev::set_root(root.clone());

    root.mkdir("dev").expect("mkdir /dev");
    let dev = root.lookup("dev").expect("lookup /dev");

    dev.mknod("null", crate::io::device::S_IFCHR, 1)
        .expect("mknod /dev/null");
    dev.mknod("zero", crate::io::device::S_IFCHR, 2)
        .expect("mknod /dev/zero");

    // tty0 is installed directly (not through RamVnode::mknod's fixed
    // null/zero table) since it wraps the kernel's real TtyDevice rather
    // than a synthetic one.
    let tty: Arc<dyn crate::io::device::Device> = Arc::new(crate::io::tty_device::TtyDevice::new(0));
    dev.link("tty0", &ramfs::RamVnode::new_device(ramfs::next_ino(), tty))
        .expect("link /dev/tty0");

    log::info!("fs: root ramfs mounted, /dev populated");
}
