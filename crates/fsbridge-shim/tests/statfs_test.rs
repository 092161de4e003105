//! Filesystem-wide queries on the directory under test.

mod common;

use common::{close_owned, open, TestDir};
use nix::sys::statfs::{fstatfs, statfs};

#[test]
fn test_statfs_reports_filesystem() {
    let dir = TestDir::new();
    let stats = statfs(dir.path()).unwrap();

    assert!(stats.block_size() as u64 > 0);
    #[cfg(not(target_vendor = "apple"))]
    assert_ne!(stats.filesystem_type().0, 0);
    #[cfg(target_vendor = "apple")]
    assert!(!stats.filesystem_type_name().is_empty());
}

#[test]
fn test_fstatfs_matches_statfs() {
    let dir = TestDir::new();
    let fd = open(dir.path(), libc::O_RDONLY | libc::O_DIRECTORY, 0);

    let by_path = statfs(dir.path()).unwrap();
    let by_fd = fstatfs(&fd).unwrap();
    assert_eq!(by_fd.block_size(), by_path.block_size());
    #[cfg(not(target_vendor = "apple"))]
    assert_eq!(by_fd.filesystem_type(), by_path.filesystem_type());
    close_owned(fd);
}
