//! Local submission history.
//!
//! Stores `SubmissionRecord`s as one JSON object per line. Stands in for
//! the remote submission store when running the CLI or API locally.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::streak::SubmissionRecord;

pub struct SubmissionStore {
    path: PathBuf,
}

impl SubmissionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record. Failures are logged, not returned.
    pub fn append(&self, record: &SubmissionRecord) {
        if let Some(dir) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                error!("Failed to create submission dir: {e}");
                return;
            }
        }

        match fs::OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(mut file) => match serde_json::to_string(record) {
                Ok(json) => {
                    if let Err(e) = writeln!(file, "{json}") {
                        error!("Failed to write submission record: {e}");
                    } else {
                        debug!("Saved submission {} to {}", record.id, self.path.display());
                    }
                }
                Err(e) => error!("Failed to serialize submission: {e}"),
            },
            Err(e) => error!("Failed to open submission store: {e}"),
        }
    }

    /// All readable records, in file order. Malformed lines are skipped.
    pub fn load(&self) -> Vec<SubmissionRecord> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                debug!("No submissions at {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<SubmissionRecord>(&line) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping malformed submission line: {e}");
                    None
                }
            })
            .collect()
    }
}
