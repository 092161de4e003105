//! # fsbridge probe
//!
//! Exercises every bridge entry point against a scratch directory and
//! checks that results and errno match what the OS reports for the same
//! call made directly.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use anyhow::{Context, Result};
use console::{style, Emoji};
use fsbridge_config::log_cli_debug;
use fsbridge_shim::{checked, errno, ffi, set_errno, FileControl, Host, FAILED};
use nix::errno::Errno;
use nix::fcntl::{FdFlag, OFlag};
use tracing::field::display;

static CHECK: Emoji<'_, '_> = Emoji("✔ ", "[ok] ");
static CROSS: Emoji<'_, '_> = Emoji("✘ ", "[!!] ");
static DOT: Emoji<'_, '_> = Emoji("● ", "[-] ");

#[derive(Debug, Default)]
pub struct ProbeReport {
    pub passed: u32,
    pub failed: u32,
}

impl ProbeReport {
    fn record(&mut self, name: &str, outcome: std::result::Result<(), String>) {
        match outcome {
            Ok(()) => {
                self.passed += 1;
                eprintln!("  {} {}", CHECK, style(name).green());
            }
            Err(why) => {
                self.failed += 1;
                eprintln!("  {} {}: {}", CROSS, style(name).red(), why);
            }
        }
    }

    pub fn ok(&self) -> bool {
        self.failed == 0
    }
}

fn c_path(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .with_context(|| format!("path contains NUL: {}", path.display()))
}

fn expect_errno(ret: libc::c_int, expected: libc::c_int) -> std::result::Result<(), String> {
    if ret != FAILED {
        return Err(format!("expected failure, got {ret}"));
    }
    match errno() {
        e if e == expected => Ok(()),
        e => Err(format!("errno {} != {}", Errno::from_raw(e), Errno::from_raw(expected))),
    }
}

fn close(fd: libc::c_int) {
    if let Err(e) = nix::unistd::close(fd) {
        log_cli_debug!("Close failed", fd = fd, error = display(e));
    }
}

/// Run all probes inside a fresh subdirectory of `root`.
pub fn run(root: &Path) -> Result<ProbeReport> {
    let scratch = tempfile::Builder::new()
        .prefix("fsbridge-probe-")
        .tempdir_in(root)
        .with_context(|| format!("cannot create scratch dir in {}", root.display()))?;
    let dir = scratch.path();
    log_cli_debug!("Probing", dir = display(dir.display()));

    eprintln!();
    eprintln!("{}", style("fsbridge probe").bold().cyan());
    eprintln!("{}", style("─".repeat(40)).dim());
    eprintln!("  {} {}", DOT, style(dir.display()).dim());

    let mut report = ProbeReport::default();

    eprintln!();
    eprintln!("{}", style("open").bold());
    probe_open(dir, &mut report)?;

    eprintln!();
    eprintln!("{}", style("fcntl").bold());
    probe_fcntl(dir, &mut report)?;

    #[cfg(target_vendor = "apple")]
    {
        eprintln!();
        eprintln!("{}", style("fcntl control blocks").bold());
        probe_blocks(dir, &mut report)?;
    }
    #[cfg(not(target_vendor = "apple"))]
    {
        eprintln!();
        let note = "control-block extension not available on this host";
        eprintln!("  {} {}", DOT, style(note).dim());
    }

    eprintln!();
    eprintln!("{}", style("─".repeat(40)).dim());
    eprintln!(
        "  {} passed, {} failed",
        style(report.passed).green().bold(),
        style(report.failed).red().bold(),
    );
    eprintln!();

    Ok(report)
}

fn probe_open(dir: &Path, report: &mut ProbeReport) -> Result<()> {
    let created = c_path(&dir.join("test.txt"))?;
    let fd = Host.open(&created, libc::O_CREAT | libc::O_RDWR, 0o644);
    report.record(
        "O_CREAT|O_RDWR returns a descriptor",
        if fd >= 0 {
            Ok(())
        } else {
            Err(format!("errno {}", Errno::last()))
        },
    );
    if fd >= 0 {
        close(fd);
    }

    let orphan = c_path(&dir.join("missing/test.txt"))?;
    set_errno(0);
    let ret = Host.open(&orphan, libc::O_CREAT | libc::O_RDWR, 0o644);
    report.record("missing parent fails with ENOENT", expect_errno(ret, libc::ENOENT));

    set_errno(0);
    let ret = Host.open(&created, libc::O_CREAT | libc::O_EXCL | libc::O_RDWR, 0o644);
    report.record("O_EXCL on existing file fails with EEXIST", expect_errno(ret, libc::EEXIST));

    // Same call, shim vs. libc, must fail identically
    set_errno(0);
    let shim = unsafe { ffi::open3(orphan.as_ptr(), libc::O_RDONLY, 0) };
    let shim_errno = errno();
    set_errno(0);
    let direct = unsafe { libc::open(orphan.as_ptr(), libc::O_RDONLY) };
    let direct_errno = errno();
    report.record(
        "open3 matches libc::open",
        if (shim, shim_errno) == (direct, direct_errno) {
            Ok(())
        } else {
            Err(format!("({shim}, {shim_errno}) != ({direct}, {direct_errno})"))
        },
    );

    Ok(())
}

fn probe_fcntl(dir: &Path, report: &mut ProbeReport) -> Result<()> {
    let fd = checked::open(dir.join("fcntl.txt"), OFlag::O_CREAT | OFlag::O_RDWR, 0o644)
        .context("cannot create fcntl probe file")?;

    report.record(
        "F_GETFL reports access mode from open",
        match checked::get_fl(fd) {
            Ok(fl) if (fl & OFlag::O_ACCMODE) == OFlag::O_RDWR => Ok(()),
            Ok(fl) => Err(format!("flags {:#o}", fl.bits())),
            Err(e) => Err(e.to_string()),
        },
    );

    report.record(
        "F_SETFL O_NONBLOCK round-trips",
        checked::set_fl(fd, OFlag::O_NONBLOCK)
            .and_then(|()| checked::get_fl(fd))
            .map_err(|e| e.to_string())
            .and_then(|fl| {
                if fl.contains(OFlag::O_NONBLOCK) {
                    Ok(())
                } else {
                    Err("O_NONBLOCK not set".to_string())
                }
            }),
    );

    report.record(
        "F_SETFD FD_CLOEXEC round-trips",
        checked::set_fd(fd, FdFlag::FD_CLOEXEC)
            .and_then(|()| checked::get_fd(fd))
            .map_err(|e| e.to_string())
            .and_then(|fd_flags| {
                if fd_flags.contains(FdFlag::FD_CLOEXEC) {
                    Ok(())
                } else {
                    Err("FD_CLOEXEC not set".to_string())
                }
            }),
    );

    let shim = unsafe { ffi::fcntl_int(fd, libc::F_GETFL, 0) };
    let direct = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    report.record(
        "fcntl_int matches libc::fcntl",
        if shim == direct {
            Ok(())
        } else {
            Err(format!("{shim} != {direct}"))
        },
    );

    close(fd);

    set_errno(0);
    let ret = unsafe { Host.control(libc::c_int::MAX - 1, libc::F_GETFL, 0) };
    report.record("bad descriptor fails with EBADF", expect_errno(ret, libc::EBADF));

    Ok(())
}

#[cfg(target_vendor = "apple")]
fn probe_blocks(dir: &Path, report: &mut ProbeReport) -> Result<()> {
    use fsbridge_shim::FStore;

    let fd = checked::open(dir.join("blocks.bin"), OFlag::O_CREAT | OFlag::O_RDWR, 0o644)
        .context("cannot create control-block probe file")?;

    let mut store = FStore::new(0, fsbridge_shim::block::F_PEOFPOSMODE, 0, 1 << 20);
    report.record(
        "F_PREALLOCATE allocates requested bytes",
        match checked::preallocate(fd, &mut store) {
            Ok(n) if n >= 1 << 20 => Ok(()),
            Ok(n) => Err(format!("only {n} bytes allocated")),
            Err(e) => Err(e.to_string()),
        },
    );

    let punched = if unsafe { libc::ftruncate(fd, 1 << 20) } == 0 {
        checked::punch_hole(fd, 0, 1 << 16).map_err(|e| e.to_string())
    } else {
        Err(format!("ftruncate: {}", Errno::last()))
    };
    report.record("F_PUNCHHOLE deallocates a range", punched);

    close(fd);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_passes_on_local_tmp() {
        let root = tempfile::tempdir().unwrap();
        let report = run(root.path()).unwrap();
        assert!(report.ok(), "{report:?}");
        assert!(report.passed >= 9);
        // Scratch directory is cleaned up
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_probe_missing_root_is_error() {
        assert!(run(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn test_expect_errno() {
        set_errno(libc::ENOENT);
        assert!(expect_errno(FAILED, libc::ENOENT).is_ok());
        set_errno(libc::EACCES);
        assert!(expect_errno(FAILED, libc::ENOENT).is_err());
        assert!(expect_errno(3, libc::ENOENT).is_err());
    }

    #[test]
    fn test_expect_errno_names_both_errors() {
        set_errno(libc::EACCES);
        let why = expect_errno(FAILED, libc::ENOENT).unwrap_err();
        assert!(why.contains("EACCES"), "{why}");
        assert!(why.contains("ENOENT"), "{why}");
    }

    #[test]
    fn test_close_of_invalid_descriptor_is_not_fatal() {
        // EBADF is logged and swallowed
        close(-1);
    }
}
