use std::path::PathBuf;

use serde::Serialize;

/// A record-aligned slice of the input fasta written to its own file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub ordinal: usize,
    pub path: PathBuf,
    pub record_count: usize,
}

/// One scanner invocation for one chunk. `command` is the complete argv.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanJob {
    pub chunk: Chunk,
    pub command: Vec<String>,
    pub output_path: PathBuf,
}

impl ScanJob {
    pub fn ordinal(&self) -> usize {
        self.chunk.ordinal
    }

    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Exit status of a finished scanner process. `code` is `None` when the
/// process was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStatus {
    pub code: Option<i32>,
}

impl ScanStatus {
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainHit {
    pub start: u64,
    pub end: u64,
    pub name: String,
    pub score: f64,
}

impl DomainHit {
    pub fn new(start: u64, end: u64, name: impl Into<String>, score: f64) -> Self {
        Self {
            start,
            end,
            name: name.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRecord {
    pub sequence_id: String,
    pub hits: Vec<DomainHit>,
}

impl SequenceRecord {
    pub fn new(sequence_id: impl Into<String>) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            hits: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanRunPaths {
    pub fasta: String,
    pub chunk_dir: String,
    pub result_dir: String,
    pub merged_path: Option<String>,
    pub xdom_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedJob {
    pub ordinal: usize,
    pub command: String,
    pub output_path: String,
}

impl From<&ScanJob> for PlannedJob {
    fn from(job: &ScanJob) -> Self {
        Self {
            ordinal: job.ordinal(),
            command: job.command_line(),
            output_path: job.output_path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanRunCounts {
    pub records: usize,
    pub chunks: usize,
    pub jobs: usize,
    pub merged_lines: usize,
    pub header_lines: usize,
    pub xdom_records_written: usize,
    pub hits_kept: usize,
    pub hits_dropped_by_cutoff: usize,
    pub hits_dropped_by_overlap: usize,
    pub empty_records_omitted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub dry_run: bool,
    pub command: String,
    pub fasta_sha256: String,
    pub chunk_size: usize,
    pub workers: usize,
    pub paths: ScanRunPaths,
    pub current_step: String,
    pub chunks: Vec<Chunk>,
    pub jobs: Vec<PlannedJob>,
    pub counts: ScanRunCounts,
    pub failed_step: Option<String>,
    pub failure_reason: Option<String>,
}
