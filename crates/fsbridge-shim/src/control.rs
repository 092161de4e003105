//! Typed, fixed-arity entry points.
//!
//! [`FileControl`] covers the calls every unix host has. [`PreallocControl`]
//! extends it with the struct-taking fcntl commands and is only compiled
//! where the host defines those control blocks, so code referencing it
//! fails to build elsewhere instead of failing at runtime.

use std::ffi::CStr;

use libc::{c_int, mode_t};

#[cfg(fsbridge_fstore)]
use crate::block::{FStore, PunchHole};
use crate::ffi;

/// Base capability: `open` and integer-argument `fcntl`.
///
/// Implementations must be transparent: no validation, retry or
/// interpretation of arguments, and the OS result returned as-is.
pub trait FileControl {
    /// `open(path, flags, mode)`. Returns a descriptor or `-1` with `errno`
    /// set.
    fn open(&self, path: &CStr, flags: c_int, mode: mode_t) -> c_int;

    /// `fcntl(fd, cmd, arg)`.
    ///
    /// # Safety
    ///
    /// `cmd` must be a command whose argument is a plain integer. Commands
    /// that take a pointer would have the kernel dereference `arg`.
    unsafe fn control(&self, fd: c_int, cmd: c_int, arg: c_int) -> c_int;
}

/// Darwin extension: fcntl commands taking a control block by pointer.
#[cfg(fsbridge_fstore)]
pub trait PreallocControl: FileControl {
    /// `fcntl(fd, cmd, &mut fstore_t)`. The kernel writes `fst_bytesalloc`.
    ///
    /// # Safety
    ///
    /// `cmd` must expect an `fstore_t *` (e.g. `F_PREALLOCATE`).
    unsafe fn control_prealloc(&self, fd: c_int, cmd: c_int, block: &mut FStore) -> c_int;

    /// `fcntl(fd, cmd, &fpunchhole_t)`.
    ///
    /// # Safety
    ///
    /// `cmd` must expect an `fpunchhole_t *` (e.g. `F_PUNCHHOLE`).
    unsafe fn control_punchhole(&self, fd: c_int, cmd: c_int, block: &PunchHole) -> c_int;
}

/// The running kernel, reached through the C bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Host;

impl FileControl for Host {
    #[inline]
    fn open(&self, path: &CStr, flags: c_int, mode: mode_t) -> c_int {
        unsafe { ffi::open3(path.as_ptr(), flags, mode) }
    }

    #[inline]
    unsafe fn control(&self, fd: c_int, cmd: c_int, arg: c_int) -> c_int {
        ffi::fcntl_int(fd, cmd, arg)
    }
}

#[cfg(fsbridge_fstore)]
impl PreallocControl for Host {
    #[inline]
    unsafe fn control_prealloc(&self, fd: c_int, cmd: c_int, block: &mut FStore) -> c_int {
        ffi::fcntl_fstore(fd, cmd, block as *mut FStore)
    }

    #[inline]
    unsafe fn control_punchhole(&self, fd: c_int, cmd: c_int, block: &PunchHole) -> c_int {
        ffi::fcntl_punchhole(fd, cmd, block as *const PunchHole)
    }
}
