//! # fsbridge compare
//!
//! Differential behaviour testing of two directories, usually on two
//! different filesystems. The same command sequence is applied to a fresh
//! file in each directory and every result must agree: equal values on
//! success, equal `ErrorKind` on failure, identical bytes on reads.

use std::fmt::Debug;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::fd::FromRawFd;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{bail, Context, Result};
use fsbridge_config::{log_behavior_debug, log_behavior_info, log_behavior_warn};
use fsbridge_shim::checked;
use nix::fcntl::OFlag;
use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};
use rand::RngCore;
use tracing::field::display;

const MIB: usize = 1024 * 1024;

/// Upper bound (exclusive) for generated sizes and offsets.
static MAX_SPAN: AtomicUsize = AtomicUsize::new(8 * MIB);

/// Directories the quickcheck property runs against.
static COMPARE_DIRS: RwLock<Option<(PathBuf, PathBuf)>> = RwLock::new(None);

/// Bound generated values by a maximum file size. A write of the maximum
/// span at the maximum offset could reach twice the span, so only half the
/// size is usable.
pub fn set_max_file_size_mb(mb: usize) -> Result<()> {
    let Some(bytes) = mb.checked_mul(MIB) else {
        bail!("maximum file size of {mb} MiB does not fit in memory offsets");
    };
    MAX_SPAN.store((bytes / 2).max(1), Ordering::Relaxed);
    Ok(())
}

fn max_span() -> usize {
    MAX_SPAN.load(Ordering::Relaxed)
}

/// A size or offset below the configured span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounded(pub usize);

impl Arbitrary for Bounded {
    fn arbitrary(g: &mut Gen) -> Self {
        Bounded(usize::arbitrary(g) % max_span())
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().map(Bounded))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Reopen,
    Read(Bounded),
    PRead { offset: Bounded, len: Bounded },
    Write(Bounded),
    PWrite { offset: Bounded, len: Bounded },
    Seek(Bounded),
    Truncate(Bounded),
    Fsync,
    Size,
}

impl Arbitrary for Command {
    fn arbitrary(g: &mut Gen) -> Self {
        match u8::arbitrary(g) % 9 {
            0 => Command::Reopen,
            1 => Command::Read(Bounded::arbitrary(g)),
            2 => Command::PRead {
                offset: Bounded::arbitrary(g),
                len: Bounded::arbitrary(g),
            },
            3 => Command::Write(Bounded::arbitrary(g)),
            4 => Command::PWrite {
                offset: Bounded::arbitrary(g),
                len: Bounded::arbitrary(g),
            },
            5 => Command::Seek(Bounded::arbitrary(g)),
            6 => Command::Truncate(Bounded::arbitrary(g)),
            7 => Command::Fsync,
            _ => Command::Size,
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self.clone() {
            Command::Read(n) => Box::new(n.shrink().map(Command::Read)),
            Command::PRead { offset, len } => Box::new(
                offset
                    .shrink()
                    .zip(len.shrink())
                    .map(|(offset, len)| Command::PRead { offset, len }),
            ),
            Command::Write(n) => Box::new(n.shrink().map(Command::Write)),
            Command::PWrite { offset, len } => Box::new(
                offset
                    .shrink()
                    .zip(len.shrink())
                    .map(|(offset, len)| Command::PWrite { offset, len }),
            ),
            Command::Seek(n) => Box::new(n.shrink().map(Command::Seek)),
            Command::Truncate(n) => Box::new(n.shrink().map(Command::Truncate)),
            Command::Reopen | Command::Fsync | Command::Size => quickcheck::empty_shrinker(),
        }
    }
}

/// Scratch file opened read/write through the shim. Removed on drop.
pub struct TestFile {
    path: PathBuf,
    file: File,
}

impl TestFile {
    /// Failures keep the raw OS error so both sides compare by errno kind.
    fn open_with(path: &Path, flags: OFlag) -> io::Result<File> {
        let fd = checked::open(path, flags, 0o644)?;
        // SAFETY: fd was just returned by open(2) and is owned by nobody else
        Ok(unsafe { File::from_raw_fd(fd) })
    }

    pub fn create_new(path: PathBuf) -> Result<Self> {
        let file = Self::open_with(&path, OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR)
            .with_context(|| format!("create {}", path.display()))?;
        Ok(Self { path, file })
    }

    /// Drop the current descriptor and open a fresh one at offset zero.
    pub fn reopen(&mut self) -> io::Result<()> {
        self.file = Self::open_with(&self.path, OFlag::O_RDWR)?;
        Ok(())
    }

    pub fn size(&self) -> io::Result<u64> {
        std::fs::metadata(&self.path).map(|md| md.len())
    }
}

impl Drop for TestFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log_behavior_warn!(
                "Failed to remove test file",
                path = display(self.path.display()),
                error = display(e),
            );
        }
    }
}

/// The same file name in two directories.
pub struct FilePair {
    left: TestFile,
    right: TestFile,
}

impl FilePair {
    pub fn create(left_dir: &Path, right_dir: &Path) -> Result<Self> {
        let name = format!("{}.bin", uuid::Uuid::now_v7());
        let left = TestFile::create_new(left_dir.join(&name))?;
        let right = TestFile::create_new(right_dir.join(&name))?;
        Ok(Self { left, right })
    }

    pub fn run(&mut self, commands: &[Command]) -> Result<()> {
        log_behavior_debug!("Running sequence", commands = commands.len());
        for (step, cmd) in commands.iter().enumerate() {
            self.apply(cmd)
                .with_context(|| format!("step {step}: {cmd:?}"))?;
        }
        Ok(())
    }

    pub fn apply(&mut self, cmd: &Command) -> Result<()> {
        let (l, r) = (&mut self.left, &mut self.right);
        match *cmd {
            Command::Reopen => same_result(l.reopen(), r.reopen()),
            Command::Read(Bounded(len)) => {
                let mut lbuf = vec![0u8; len];
                let mut rbuf = vec![0u8; len];
                same_result(l.file.read(&mut lbuf), r.file.read(&mut rbuf))?;
                same_bytes(&lbuf, &rbuf)
            }
            Command::PRead {
                offset: Bounded(offset),
                len: Bounded(len),
            } => {
                let mut lbuf = vec![0u8; len];
                let mut rbuf = vec![0u8; len];
                same_result(
                    l.file.read_at(&mut lbuf, offset as u64),
                    r.file.read_at(&mut rbuf, offset as u64),
                )?;
                same_bytes(&lbuf, &rbuf)
            }
            Command::Write(Bounded(len)) => {
                let data = random_bytes(len);
                same_result(l.file.write(&data), r.file.write(&data))
            }
            Command::PWrite {
                offset: Bounded(offset),
                len: Bounded(len),
            } => {
                let data = random_bytes(len);
                same_result(
                    l.file.write_at(&data, offset as u64),
                    r.file.write_at(&data, offset as u64),
                )
            }
            Command::Seek(Bounded(pos)) => {
                let pos = SeekFrom::Start(pos as u64);
                same_result(l.file.seek(pos), r.file.seek(pos))
            }
            Command::Truncate(Bounded(len)) => {
                same_result(l.file.set_len(len as u64), r.file.set_len(len as u64))
            }
            Command::Fsync => same_result(l.file.sync_all(), r.file.sync_all()),
            Command::Size => {
                // Sizes are only comparable once both sides are flushed
                same_result(l.file.sync_all(), r.file.sync_all())?;
                same_result(l.size(), r.size())
            }
        }
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::rng().fill_bytes(&mut data);
    data
}

fn same_result<T: Eq + Debug>(left: io::Result<T>, right: io::Result<T>) -> Result<()> {
    match (left, right) {
        (Ok(l), Ok(r)) if l == r => Ok(()),
        (Ok(l), Ok(r)) => bail!("Ok result mismatch: {l:?} != {r:?}"),
        (Err(l), Err(r)) if l.kind() == r.kind() => Ok(()),
        (Err(l), Err(r)) => bail!("Err result mismatch: {l:?} != {r:?}"),
        (Ok(l), Err(r)) => bail!("Result mismatch: Ok({l:?}) != Err({r:?})"),
        (Err(l), Ok(r)) => bail!("Result mismatch: Err({l:?}) != Ok({r:?})"),
    }
}

fn same_bytes(left: &[u8], right: &[u8]) -> Result<()> {
    if let Some((offset, (l, r))) = left
        .iter()
        .zip(right)
        .enumerate()
        .find(|(_, (l, r))| l != r)
    {
        bail!("Bytes read do not match, first difference at buffer offset {offset}: {l} != {r}");
    }
    Ok(())
}

fn prop_same_behavior(commands: Vec<Command>) -> TestResult {
    let dirs = COMPARE_DIRS
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    let Some((left, right)) = dirs else {
        return TestResult::discard();
    };

    match FilePair::create(&left, &right).and_then(|mut pair| pair.run(&commands)) {
        Ok(()) => TestResult::passed(),
        Err(e) => TestResult::error(format!("{e:#}")),
    }
}

/// Run `tests` random sequences against both directories. Returns the
/// number of sequences that passed.
pub fn compare(left: &Path, right: &Path, tests: u64) -> Result<u64> {
    for dir in [left, right] {
        if !dir.is_dir() {
            bail!("not a directory: {}", dir.display());
        }
    }
    *COMPARE_DIRS.write().unwrap_or_else(|e| e.into_inner()) =
        Some((left.to_path_buf(), right.to_path_buf()));

    log_behavior_info!(
        "Comparing directories",
        left = display(left.display()),
        right = display(right.display()),
        tests = tests,
        max_span = max_span(),
    );

    let result = QuickCheck::new()
        .tests(tests)
        .max_tests(tests.saturating_mul(10))
        .quicktest(prop_same_behavior as fn(Vec<Command>) -> TestResult);

    *COMPARE_DIRS.write().unwrap_or_else(|e| e.into_inner()) = None;

    match result {
        Ok(passed) => Ok(passed),
        Err(failure) => bail!("behaviour diverged: {failure:?}"),
    }
}

/// Sequences that once made two filesystems disagree.
pub fn regressions() -> Vec<Vec<Command>> {
    use Command::*;

    vec![
        vec![
            PWrite {
                offset: Bounded(2011037),
                len: Bounded(2539667),
            },
            PRead {
                offset: Bounded(1),
                len: Bounded(5),
            },
        ],
        vec![Truncate(Bounded(1))],
        vec![
            Truncate(Bounded(2)),
            PRead {
                offset: Bounded(1),
                len: Bounded(1),
            },
        ],
        vec![
            Truncate(Bounded(2532034)),
            Write(Bounded(2419266)),
            Truncate(Bounded(662889)),
            Reopen,
            PRead {
                offset: Bounded(796278),
                len: Bounded(1411041),
            },
        ],
    ]
}

/// Replay every captured regression against both directories.
pub fn replay_regressions(left: &Path, right: &Path) -> Result<usize> {
    let cases = regressions();
    for (i, commands) in cases.iter().enumerate() {
        log_behavior_info!("Replaying regression", case = i + 1, commands = commands.len());
        FilePair::create(left, right)?
            .run(commands)
            .with_context(|| format!("regression {}", i + 1))?;
    }
    Ok(cases.len())
}
