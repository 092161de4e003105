//! # fsbridge-shim
//!
//! Fixed-arity bridges over the variadic `open(2)` and `fcntl(2)` calls.
//!
//! Two layers:
//!
//! - [`ffi`]: the raw C bridge. Pure pass-through: return value and `errno`
//!   are whatever the OS produced. Nothing is logged or translated.
//! - [`checked`]: an opt-in `Result` view over the same calls, for Rust
//!   callers that want typed flags and [`ShimError`].
//!
//! The typed surface is capability-gated. [`FileControl`] is always present;
//! [`PreallocControl`] and the Darwin control blocks exist only when the
//! build script detected the `fstore_t` / `fpunchhole_t` extension.

#[cfg(fsbridge_fstore)]
pub mod block;
pub mod checked;
pub mod control;
pub mod error;
pub mod ffi;

#[cfg(fsbridge_fstore)]
pub use block::{FStore, PunchHole};
#[cfg(fsbridge_fstore)]
pub use control::PreallocControl;
pub use control::{FileControl, Host};
pub use error::{errno, set_errno, ShimError};

/// Sentinel returned by every bridge on failure.
pub const FAILED: libc::c_int = -1;

/// Whether the Darwin control-block extension was compiled in.
pub const HAS_FSTORE: bool = cfg!(fsbridge_fstore);
