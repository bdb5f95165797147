/*
 * S1-S4: name resolution and the FD syscall layer, end to end.
 */

use super::fixture;
use crate::fs::namev;
use crate::fs::syscall::{self, O_CREAT, O_RDWR};
use crate::io::device::{Errno, SEEK_SET};

/// S1 -- path walk. `/a` and `/a/b` exist, `/a/b/c` does not:
/// `dir_namev("/a/b/c")` must yield parent `/a/b`, basename "c", and a
/// subsequent `lookup` of "c" must fail `ENOENT`. `open(O_RDWR|O_CREAT)`
/// then creates it and returns FD 3 (stdin/stdout/stderr occupy 0-2).
#[test]
fn s1_path_walk_and_create_on_open() {
    let pid = fixture::boot();
    syscall::do_mkdir(pid, "/a").expect("mkdir /a");
    syscall::do_mkdir(pid, "/a/b").expect("mkdir /a/b");

    let root = namev::root();
    let resolved = namev::dir_namev("/a/b/c", Some(&root)).expect("dir_namev");
    assert_eq!(resolved.name, "c");
    assert_eq!(
        namev::lookup(&resolved.parent, "c").unwrap_err(),
        Errno::ENOENT
    );

    let fd = syscall::do_open(pid, "/a/b/c", O_RDWR | O_CREAT).expect("open O_CREAT");
    assert_eq!(fd, 3);
}

/// S2 -- write+read round trip.
#[test]
fn s2_write_then_read_round_trip() {
    let pid = fixture::boot();
    let fd = syscall::do_open(pid, "/f", O_RDWR | O_CREAT).expect("open");

    let n = syscall::do_write(pid, fd, b"hello").expect("write");
    assert_eq!(n, 5);

    let pos = syscall::do_lseek(pid, fd, 0, SEEK_SET).expect("lseek");
    assert_eq!(pos, 0);

    let mut buf = [0u8; 5];
    let n = syscall::do_read(pid, fd, &mut buf).expect("read");
    assert_eq!(n, 5);
    assert_eq!(&buf, b"hello");
}

/// S3 -- `dup2` closes its target and the two descriptors then share one
/// handle: redirecting FD 4 onto FD 3 makes reads through FD 4 come from
/// whatever FD 3 is bound to.
#[test]
fn s3_dup2_closes_target_and_redirects() {
    let pid = fixture::boot();
    let fd_a = syscall::do_open(pid, "/a", O_RDWR | O_CREAT).expect("open /a");
    syscall::do_write(pid, fd_a, b"A").expect("write /a");
    syscall::do_lseek(pid, fd_a, 0, SEEK_SET).expect("rewind /a");

    let fd_b = syscall::do_open(pid, "/b", O_RDWR | O_CREAT).expect("open /b");
    syscall::do_write(pid, fd_b, b"B").expect("write /b");

    let result = syscall::do_dup2(pid, fd_a, fd_b).expect("dup2");
    assert_eq!(result, fd_b);

    let mut buf = [0u8; 1];
    syscall::do_read(pid, fd_b, &mut buf).expect("read via redirected fd");
    assert_eq!(&buf, b"A", "fd_b now reads from /a, not /b");

    syscall::do_close(pid, fd_a).expect("close fd_a");
    syscall::do_close(pid, fd_b).expect("close fd_b");
}

/// S4 -- `rmdir` rejects a final component of "." (`EINVAL`) and ".."
/// (`ENOTEMPTY`), but succeeds on the directory itself once those are out
/// of the way.
#[test]
fn s4_rmdir_rejects_dot_and_dotdot() {
    let pid = fixture::boot();
    syscall::do_mkdir(pid, "/d").expect("mkdir /d");

    assert_eq!(syscall::do_rmdir(pid, "/d/.").unwrap_err(), Errno::EINVAL);
    assert_eq!(
        syscall::do_rmdir(pid, "/d/..").unwrap_err(),
        Errno::ENOTEMPTY
    );
    syscall::do_rmdir(pid, "/d").expect("rmdir /d");
}
