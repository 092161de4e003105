//! Darwin fcntl control blocks.
//!
//! Field order, size and alignment mirror `<sys/fcntl.h>`; the asserts at the
//! bottom fail the build if the layout ever drifts.

use libc::{c_int, c_uint, off_t};

/// Preallocate storage (`fstore_t *` argument).
pub const F_PREALLOCATE: c_int = 42;
/// Deallocate a byte range (`fpunchhole_t *` argument).
pub const F_PUNCHHOLE: c_int = 99;

/// Allocate contiguous space.
pub const F_ALLOCATECONTIG: c_uint = 0x0000_0002;
/// Allocate all requested space or none.
pub const F_ALLOCATEALL: c_uint = 0x0000_0004;
/// Keep the allocation past close.
pub const F_ALLOCATEPERSIST: c_uint = 0x0000_0008;

/// `fst_offset` is relative to the physical end of file.
pub const F_PEOFPOSMODE: c_int = 3;
/// `fst_offset` is relative to the volume.
pub const F_VOLPOSMODE: c_int = 4;

/// `fstore_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FStore {
    pub fst_flags: c_uint,
    pub fst_posmode: c_int,
    pub fst_offset: off_t,
    pub fst_length: off_t,
    /// Written by the kernel: bytes actually allocated.
    pub fst_bytesalloc: off_t,
}

impl FStore {
    pub fn new(flags: c_uint, posmode: c_int, offset: off_t, length: off_t) -> Self {
        Self {
            fst_flags: flags,
            fst_posmode: posmode,
            fst_offset: offset,
            fst_length: length,
            fst_bytesalloc: 0,
        }
    }

    /// Request `length` bytes past the physical end of file, contiguous if
    /// the volume allows it.
    pub fn extend_by(length: off_t) -> Self {
        Self::new(F_ALLOCATECONTIG, F_PEOFPOSMODE, 0, length)
    }
}

/// `fpunchhole_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PunchHole {
    pub fp_flags: c_uint,
    pub reserved: c_uint,
    pub fp_offset: off_t,
    pub fp_length: off_t,
}

impl PunchHole {
    pub fn new(offset: off_t, length: off_t) -> Self {
        Self {
            fp_flags: 0,
            reserved: 0,
            fp_offset: offset,
            fp_length: length,
        }
    }
}

const _: () = assert!(std::mem::size_of::<FStore>() == 32);
const _: () = assert!(std::mem::align_of::<FStore>() == 8);
const _: () = assert!(std::mem::size_of::<PunchHole>() == 24);
const _: () = assert!(std::mem::align_of::<PunchHole>() == 8);
