//! Raw bindings to the C bridge (`src/c/wrappers.c`).
//!
//! Every function here forwards its arguments unchanged and returns the OS
//! result unchanged: a non-negative value on success, `-1` with `errno` set
//! on failure.

use libc::{c_char, c_int, mode_t};

#[cfg(fsbridge_fstore)]
use crate::block::{FStore, PunchHole};

extern "C" {
    /// `open(path, oflag, mode)`, always passing `mode`.
    pub fn open3(path: *const c_char, oflag: c_int, mode: mode_t) -> c_int;

    /// `fcntl(fd, cmd, arg)` for commands whose third argument is an `int`.
    pub fn fcntl_int(fd: c_int, cmd: c_int, arg: c_int) -> c_int;

    /// `fcntl(fd, cmd, fstore_t *)`, e.g. `F_PREALLOCATE`.
    #[cfg(fsbridge_fstore)]
    pub fn fcntl_fstore(fd: c_int, cmd: c_int, store: *mut FStore) -> c_int;

    /// `fcntl(fd, cmd, fpunchhole_t *)`, e.g. `F_PUNCHHOLE`.
    #[cfg(fsbridge_fstore)]
    pub fn fcntl_punchhole(fd: c_int, cmd: c_int, hole: *const PunchHole) -> c_int;

    pub(crate) fn fsbridge_get_errno() -> c_int;
    pub(crate) fn fsbridge_set_errno(e: c_int);
}
