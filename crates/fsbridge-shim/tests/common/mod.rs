//! Shared fixtures for the integration tests.
//!
//! Each test gets its own scratch directory. By default it lives under the
//! system temp dir; set `FSBRIDGE_TEST_ROOT` to run the suite against a
//! different filesystem (e.g. a FUSE mountpoint).

#![allow(dead_code)]

use std::ffi::CString;
use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use fsbridge_shim::{errno, FileControl, Host};
use nix::errno::Errno;
use nix::sys::stat::{FchmodatFlags, FileStat, Mode};
use tempfile::TempDir;

/// Size of the bulk read/write fixtures. Not a multiple of 26, so every
/// alphabet-pattern file ends in a partial run.
pub const DATA_SIZE: usize = 15 * 1024 * 1024;

pub const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Owner read only.
pub const RO: libc::mode_t = libc::S_IRUSR;
/// Owner read and write.
pub const RW: libc::mode_t = libc::S_IRUSR | libc::S_IWUSR;

pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        let mut builder = tempfile::Builder::new();
        builder.prefix("fsbridge-");
        let dir = match std::env::var_os("FSBRIDGE_TEST_ROOT") {
            Some(root) => {
                std::fs::create_dir_all(&root).unwrap();
                builder.tempdir_in(root).unwrap()
            }
            None => builder.tempdir().unwrap(),
        };
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// NUL-terminated path of `name` inside this directory.
    pub fn c_path(&self, name: &str) -> CString {
        c_string(&self.join(name))
    }
}

pub fn c_string(path: &Path) -> CString {
    CString::new(path.as_os_str().as_bytes()).unwrap()
}

/// Create `path` with `data` and the given permission bits, through the shim.
pub fn create_file(path: &Path, data: &[u8], perms: libc::mode_t) {
    let fd = open(path, libc::O_WRONLY | libc::O_CREAT, perms);
    let written = nix::unistd::write(&fd, data).unwrap();
    assert_eq!(written, data.len());
    close_owned(fd);
}

/// `open3` through the shim, returning the errno on failure.
pub fn try_open(path: &Path, flags: libc::c_int, mode: libc::mode_t) -> Result<OwnedFd, Errno> {
    let fd = Host.open(&c_string(path), flags, mode);
    if fd < 0 {
        return Err(Errno::from_raw(errno()));
    }
    // SAFETY: fresh descriptor from open(2), owned by nobody else
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// `open3` through the shim; the call must succeed.
pub fn open(path: &Path, flags: libc::c_int, mode: libc::mode_t) -> OwnedFd {
    try_open(path, flags, mode)
        .unwrap_or_else(|e| panic!("open {} failed: {e}", path.display()))
}

pub fn close(fd: libc::c_int) {
    assert_eq!(unsafe { libc::close(fd) }, 0);
}

/// Close explicitly so a failing `close(2)` fails the test.
pub fn close_owned(fd: OwnedFd) {
    nix::unistd::close(fd.into_raw_fd()).unwrap();
}

pub fn chmod(path: &Path, mode: libc::mode_t) {
    nix::sys::stat::fchmodat(
        None,
        path,
        Mode::from_bits_truncate(mode),
        FchmodatFlags::FollowSymlink,
    )
    .unwrap();
}

pub fn stat(path: &Path) -> FileStat {
    nix::sys::stat::stat(path).unwrap()
}

pub fn lstat(path: &Path) -> FileStat {
    nix::sys::stat::lstat(path).unwrap()
}

pub fn file_size(path: &Path) -> usize {
    stat(path).st_size as usize
}

pub fn exists(path: &Path) -> bool {
    nix::unistd::access(path, nix::unistd::AccessFlags::F_OK).is_ok()
}

/// Whole file contents as text.
pub fn read_file(path: &Path) -> String {
    String::from_utf8_lossy(&std::fs::read(path).unwrap()).into_owned()
}

/// `size` bytes of the repeating alphabet, starting at `a`.
pub fn alphabet(size: usize) -> Vec<u8> {
    ALPHABET.iter().copied().cycle().take(size).collect()
}

/// Permission bits are not enforced against root, so tests expecting
/// `EACCES` expect success instead when running as root.
pub fn enforces_permissions() -> bool {
    !nix::unistd::geteuid().is_root()
}
