//! Timing profile ingestion
//!
//! Stream layout (newline-delimited JSON):
//!   line 1   partition layout
//!   line 2   benchmark configuration (opaque)
//!   line 3+  one entry per measurement round
//!   blank    end of stream; anything after it is ignored
//!
//! The first `skip` entries are cold-start rounds and are discarded.

mod entry;

pub use entry::{Entry, EventTime, PrimalProfile, SolverProfile, DECODED_EVENT};

use crate::tree::{PartitionConfig, PartitionLayout};
use crate::{AnalysisError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Cold-start entries discarded by default
pub const DEFAULT_SKIP: usize = 20;

/// Parsed, read-only timing profile
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    config: PartitionConfig,
    benchmark_config: Value,
    entries: Vec<Entry>,
    skipped: usize,
}

fn parse_line<T: DeserializeOwned>(line: &str, line_no: usize) -> Result<T> {
    serde_json::from_str(line).map_err(|e| AnalysisError::Parse {
        line: line_no,
        message: e.to_string(),
    })
}

impl Profile {
    /// Assemble a profile from values already in memory
    pub fn new(config: PartitionConfig, benchmark_config: Value, entries: Vec<Entry>) -> Self {
        Self {
            config,
            benchmark_config,
            entries,
            skipped: 0,
        }
    }

    /// Read a profile stream, discarding the first `skip` entries
    ///
    /// Every non-blank line before the terminator is parsed, including
    /// discarded ones.
    pub fn from_reader<R: BufRead>(reader: R, skip: usize) -> Result<Self> {
        let mut config = None;
        let mut benchmark_config = None;
        let mut entries = Vec::new();
        let mut skipped = 0;

        for (index, raw) in reader.split(b'\n').enumerate() {
            let line_no = index + 1;
            let line = String::from_utf8(raw?).map_err(|e| AnalysisError::Parse {
                line: line_no,
                message: e.to_string(),
            })?;
            let line = line.trim_matches(|c| c == '\r' || c == '\n' || c == ' ');
            if line.is_empty() {
                debug!(line = line_no, "blank line terminates profile stream");
                break;
            }

            match index {
                0 => {
                    let layout: PartitionLayout = parse_line(line, line_no)?;
                    config = Some(PartitionConfig::from_layout(layout)?);
                }
                1 => benchmark_config = Some(parse_line::<Value>(line, line_no)?),
                _ => {
                    let entry: Entry = parse_line(line, line_no)?;
                    if skipped < skip {
                        skipped += 1;
                    } else {
                        entries.push(entry);
                    }
                }
            }
        }

        let (config, benchmark_config) = match (config, benchmark_config) {
            (Some(config), Some(benchmark_config)) => (config, benchmark_config),
            (config, _) => {
                let found = usize::from(config.is_some());
                return Err(AnalysisError::Format(format!(
                    "expected 2 header lines before data, found {found}"
                )));
            }
        };

        debug!(
            partitions = config.partition_count(),
            retained = entries.len(),
            skipped,
            "profile ingested"
        );

        Ok(Self {
            config,
            benchmark_config,
            entries,
            skipped,
        })
    }

    /// Read a profile from text
    pub fn parse(text: &str, skip: usize) -> Result<Self> {
        Self::from_reader(text.as_bytes(), skip)
    }

    /// Read a profile file
    pub fn from_path<P: AsRef<Path>>(path: P, skip: usize) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), skip)
    }

    /// Tree the profile was captured against
    pub fn partition_config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Benchmark configuration, passed through unexamined
    pub fn benchmark_config(&self) -> &Value {
        &self.benchmark_config
    }

    /// Retained entries in stream order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry was retained
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cold-start entries discarded
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// `noisy_measurements` from the benchmark configuration, if recorded
    pub fn noisy_measurements(&self) -> Option<u64> {
        self.benchmark_config
            .get("noisy_measurements")
            .and_then(Value::as_u64)
    }
}
