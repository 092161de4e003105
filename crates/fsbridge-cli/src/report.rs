//! # fsbridge report
//!
//! Tabulates conformance-suite results across filesystems. The input is a
//! directory holding one `<filesystem>.json` file per run of the suite, each
//! the JSON-lines stream libtest writes with `--format json`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use fsbridge_config::log_cli_debug;
use serde::Deserialize;
use tracing::field::display;

/// One line of libtest JSON output. Suite and bench events are skipped.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Line {
    Test { name: String, event: TestEvent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TestEvent {
    Ok,
    Failed,
    Ignored,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
    /// Ignored, or never run on that filesystem.
    Skip,
}

impl Outcome {
    pub fn symbol(self) -> &'static str {
        match self {
            Outcome::Pass => "\u{2705}",
            Outcome::Fail => "\u{274c}",
            Outcome::Skip => "\u{26a0}",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Csv,
    Markdown,
}

/// Outcome of every test on every filesystem, sorted by name.
#[derive(Debug, Default)]
pub struct Report {
    filesystems: BTreeSet<String>,
    tests: BTreeMap<String, BTreeMap<String, Outcome>>,
}

impl Report {
    /// Read every regular file in `dir`; the file stem names the filesystem.
    pub fn load(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("cannot read results directory {}", dir.display()))?;

        let mut report = Report::default();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(fs) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let parsed = report
                .add_run(&fs, &contents)
                .with_context(|| format!("malformed results in {}", path.display()))?;
            log_cli_debug!("Loaded results", file = display(path.display()), tests = parsed);
        }
        Ok(report)
    }

    /// Record one filesystem's JSON-lines output. Returns the number of
    /// test results seen.
    pub fn add_run(&mut self, fs: &str, json_lines: &str) -> Result<usize> {
        self.filesystems.insert(fs.to_owned());

        let mut seen = 0;
        for (idx, line) in json_lines.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line: Line =
                serde_json::from_str(line).with_context(|| format!("line {}", idx + 1))?;
            let Line::Test { name, event } = line else {
                continue;
            };
            let outcome = match event {
                TestEvent::Ok => Outcome::Pass,
                TestEvent::Failed => Outcome::Fail,
                TestEvent::Ignored => Outcome::Skip,
                TestEvent::Other => continue,
            };
            self.tests.entry(name).or_default().insert(fs.to_owned(), outcome);
            seen += 1;
        }
        Ok(seen)
    }

    pub fn outcome(&self, test: &str, fs: &str) -> Outcome {
        self.tests
            .get(test)
            .and_then(|by_fs| by_fs.get(fs))
            .copied()
            .unwrap_or(Outcome::Skip)
    }

    pub fn has_failures(&self) -> bool {
        self.tests
            .values()
            .any(|by_fs| by_fs.values().any(|o| *o == Outcome::Fail))
    }

    fn rows(&self) -> impl Iterator<Item = (&str, Vec<Outcome>)> + '_ {
        self.tests.keys().map(|test| {
            let outcomes = self.filesystems.iter().map(|fs| self.outcome(test, fs)).collect();
            (test.as_str(), outcomes)
        })
    }

    pub fn render(&self, format: Format) -> String {
        match format {
            Format::Csv => self.to_csv(),
            Format::Markdown => self.to_markdown(),
        }
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("test");
        for fs in &self.filesystems {
            let _ = write!(out, ",{fs}");
        }
        out.push('\n');
        for (test, outcomes) in self.rows() {
            out.push_str(test);
            for outcome in outcomes {
                let _ = write!(out, ",{}", outcome.symbol());
            }
            out.push('\n');
        }
        out
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("| test |");
        for fs in &self.filesystems {
            let _ = write!(out, " {fs} |");
        }
        out.push_str("\n|---|");
        out.push_str(&"---|".repeat(self.filesystems.len()));
        out.push('\n');
        for (test, outcomes) in self.rows() {
            let _ = write!(out, "| `{test}` |");
            for outcome in outcomes {
                let _ = write!(out, " {} |", outcome.symbol());
            }
            out.push('\n');
        }
        out
    }
}
