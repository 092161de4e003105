//! OS error channel access and the checked-layer error type.

use std::path::PathBuf;

use libc::c_int;
use nix::errno::Errno;

use crate::ffi;

/// Current thread's `errno`, read in C so the per-platform accessor
/// (`__errno_location`, `__error`, ...) stays out of Rust.
#[inline]
pub fn errno() -> c_int {
    unsafe { ffi::fsbridge_get_errno() }
}

/// Overwrite the current thread's `errno`.
#[inline]
pub fn set_errno(e: c_int) {
    unsafe { ffi::fsbridge_set_errno(e) }
}

#[derive(Debug, thiserror::Error)]
pub enum ShimError {
    #[error("{op} failed: {errno}")]
    Os { op: &'static str, errno: Errno },
    #[error("path contains an interior NUL byte: {0:?}")]
    InvalidPath(PathBuf),
}

impl ShimError {
    /// Capture `errno` for a call that just returned the failure sentinel.
    pub(crate) fn last_os(op: &'static str) -> Self {
        ShimError::Os {
            op,
            errno: Errno::last(),
        }
    }

    /// The OS error code, if this failure came from the OS.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            ShimError::Os { errno, .. } => Some(*errno),
            ShimError::InvalidPath(_) => None,
        }
    }
}

impl From<ShimError> for std::io::Error {
    fn from(err: ShimError) -> Self {
        match err.errno() {
            Some(errno) => std::io::Error::from_raw_os_error(errno as i32),
            None => std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()),
        }
    }
}
