// src/driver/output.rs

//! On-disk output of [`Qsr::run`](super::Qsr::run).

use crate::core::QsrError;
use crate::observables::Stats;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// `<prefix><suffix>`, keeping any dots already in the prefix.
pub fn prefixed_path(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct LogEntry {
    #[serde(rename = "Iteration")]
    iteration: usize,
    #[serde(flatten)]
    observables: BTreeMap<String, Stats>,
}

#[derive(Serialize)]
struct LogDocument<'a> {
    #[serde(rename = "Output")]
    output: &'a [LogEntry],
}

/// The `<prefix>.log` observable history, rewritten in full at every checkpoint
/// so the file is always a complete JSON document.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new(prefix: &Path) -> Self {
        Self { path: prefixed_path(prefix, ".log"), entries: Vec::new() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a checkpoint and rewrites the file.
    pub fn record(&mut self, iteration: usize, observables: BTreeMap<String, Stats>) -> Result<(), QsrError> {
        self.entries.push(LogEntry { iteration, observables });
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, &LogDocument { output: &self.entries })?;
        Ok(())
    }
}
