//! `Result`-returning view over the bridge.
//!
//! Same calls as [`crate::ffi`], but failures become [`ShimError`] with the
//! errno captured immediately after the call. Descriptors are still raw:
//! the caller owns them and must close them.

use std::ffi::CString;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use libc::{c_int, mode_t};
use nix::fcntl::{FdFlag, OFlag};
use fsbridge_config::{log_shim_debug, log_shim_trace};
use tracing::field::display;

use crate::control::{FileControl, Host};
use crate::error::ShimError;
use crate::FAILED;

pub type Result<T> = std::result::Result<T, ShimError>;

fn to_cstring(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| ShimError::InvalidPath(path.to_path_buf()))
}

fn check(op: &'static str, ret: c_int) -> Result<c_int> {
    if ret == FAILED {
        let err = ShimError::last_os(op);
        log_shim_debug!("call failed", op = op, error = display(&err));
        Err(err)
    } else {
        Ok(ret)
    }
}

/// `open(path, flags, mode)`.
pub fn open(path: impl AsRef<Path>, flags: OFlag, mode: mode_t) -> Result<RawFd> {
    let path = path.as_ref();
    let c_path = to_cstring(path)?;
    log_shim_trace!(
        "open3",
        path = display(path.display()),
        flags = flags.bits(),
        mode = mode
    );
    check("open", Host.open(&c_path, flags.bits(), mode))
}

/// `fcntl(fd, cmd, arg)` with an integer argument.
///
/// # Safety
///
/// Same contract as [`FileControl::control`]: `cmd` must take an integer.
pub unsafe fn control(fd: RawFd, cmd: c_int, arg: c_int) -> Result<c_int> {
    log_shim_trace!("fcntl_int", fd = fd, cmd = cmd, arg = arg);
    check("fcntl", Host.control(fd, cmd, arg))
}

/// `fcntl(fd, F_GETFL)`: access mode and status flags.
pub fn get_fl(fd: RawFd) -> Result<OFlag> {
    let bits = unsafe { control(fd, libc::F_GETFL, 0)? };
    Ok(OFlag::from_bits_retain(bits))
}

/// `fcntl(fd, F_SETFL, flags)`. The kernel ignores access-mode bits here.
pub fn set_fl(fd: RawFd, flags: OFlag) -> Result<()> {
    unsafe { control(fd, libc::F_SETFL, flags.bits())? };
    Ok(())
}

/// `fcntl(fd, F_GETFD)`: descriptor flags (`FD_CLOEXEC`).
pub fn get_fd(fd: RawFd) -> Result<FdFlag> {
    let bits = unsafe { control(fd, libc::F_GETFD, 0)? };
    Ok(FdFlag::from_bits_retain(bits))
}

/// `fcntl(fd, F_SETFD, flags)`.
pub fn set_fd(fd: RawFd, flags: FdFlag) -> Result<()> {
    unsafe { control(fd, libc::F_SETFD, flags.bits())? };
    Ok(())
}

/// Reserve storage with `F_PREALLOCATE`. Returns the bytes the kernel
/// actually allocated.
#[cfg(fsbridge_fstore)]
pub fn preallocate(fd: RawFd, store: &mut crate::block::FStore) -> Result<libc::off_t> {
    use crate::control::PreallocControl;

    log_shim_trace!("fcntl_fstore", fd = fd, length = store.fst_length);
    check("fcntl(F_PREALLOCATE)", unsafe {
        Host.control_prealloc(fd, crate::block::F_PREALLOCATE, store)
    })?;
    Ok(store.fst_bytesalloc)
}

/// Deallocate `[offset, offset + length)` with `F_PUNCHHOLE`.
#[cfg(fsbridge_fstore)]
pub fn punch_hole(fd: RawFd, offset: libc::off_t, length: libc::off_t) -> Result<()> {
    use crate::control::PreallocControl;

    let hole = crate::block::PunchHole::new(offset, length);
    log_shim_trace!("fcntl_punchhole", fd = fd, offset = offset, length = length);
    check("fcntl(F_PUNCHHOLE)", unsafe {
        Host.control_punchhole(fd, crate::block::F_PUNCHHOLE, &hole)
    })?;
    Ok(())
}
