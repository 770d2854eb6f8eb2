//! Maps job ids onto recordings
//!
//! Recordings are discovered fresh on every invocation and sorted by full
//! path, so independent workers given the same data root agree on which
//! recording a job id names without talking to each other.

use crate::core::error::PartitionError;
use crate::core::recording::Recording;
use crate::prompt::has_extension;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Job id that lists recordings instead of analyzing one
pub const LIST_SENTINEL: i64 = -1;

/// What a job id resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSelection<'a> {
    /// Enumerate only; run nothing
    List(&'a [Recording]),
    Run(&'a Recording),
}

/// Deterministically ordered recordings under a data root
#[derive(Debug, Clone, Default)]
pub struct Partition {
    recordings: Vec<Recording>,
}

impl Partition {
    /// Recursively find files with `extension` (case-insensitive, no dot)
    pub fn discover(data_root: &Path, extension: &str) -> Result<Self, PartitionError> {
        if !data_root.is_dir() {
            return Err(PartitionError::DataRootMissing(data_root.to_path_buf()));
        }

        let mut recordings = Vec::new();
        for entry in WalkDir::new(data_root).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_file() && has_extension(entry.path(), &[extension]) {
                recordings.push(Recording::new(entry.into_path()));
            }
        }

        debug!("Found {} recordings under {}", recordings.len(), data_root.display());
        let partition = Self::from_recordings(recordings);
        for stem in partition.duplicate_stems() {
            warn!("Several recordings are named '{}'; their batch outputs share one path", stem);
        }
        Ok(partition)
    }

    pub fn from_recordings(mut recordings: Vec<Recording>) -> Self {
        recordings.sort();
        Self { recordings }
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    /// File stems shared by more than one recording
    ///
    /// Output paths are derived from the stem alone, so such recordings
    /// overwrite each other's results.
    pub fn duplicate_stems(&self) -> Vec<String> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for recording in &self.recordings {
            *counts.entry(recording.stem()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(stem, _)| stem)
            .collect()
    }

    /// Resolve a 1-based job id; [`LIST_SENTINEL`] selects the listing
    pub fn select(&self, job_id: i64) -> Result<JobSelection<'_>, PartitionError> {
        if job_id == LIST_SENTINEL {
            return Ok(JobSelection::List(&self.recordings));
        }

        let out_of_range = || PartitionError::JobOutOfRange {
            job_id,
            count: self.recordings.len(),
        };
        let index = usize::try_from(job_id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .ok_or_else(out_of_range)?;
        self.recordings
            .get(index)
            .map(JobSelection::Run)
            .ok_or_else(out_of_range)
    }

    /// One path per line, then a count line
    pub fn write_listing<W: Write>(&self, mut out: W) -> io::Result<()> {
        for recording in &self.recordings {
            writeln!(out, "{}", recording)?;
        }
        writeln!(out, "{} recordings found", self.recordings.len())
    }
}
