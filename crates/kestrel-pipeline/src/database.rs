//! Mutation database: per-mutant classification buckets, serialized as
//! one JSON document per campaign.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One classified execution: which oracle trace the mutant was judged
/// against and where the mutant's own trace was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub oracle: PathBuf,
    pub trace: PathBuf,
}

/// The verdicts collected for one mutant diff. Entries with no
/// observation in either bucket are never recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    diff: String,
    inconsistent: Vec<Observation>,
    consistent: Vec<Observation>,
}

impl DatabaseEntry {
    /// `None` when both buckets are empty.
    pub fn new(
        diff: &str,
        inconsistent: Vec<Observation>,
        consistent: Vec<Observation>,
    ) -> Option<Self> {
        if inconsistent.is_empty() && consistent.is_empty() {
            return None;
        }
        Some(Self {
            diff: diff.to_string(),
            inconsistent,
            consistent,
        })
    }

    pub fn diff(&self) -> &str {
        &self.diff
    }

    /// Observations where the mutant diverged from the oracle: the mutant
    /// was killed.
    pub fn inconsistent(&self) -> &[Observation] {
        &self.inconsistent
    }

    /// Observations indistinguishable from the oracle within noise.
    pub fn consistent(&self) -> &[Observation] {
        &self.consistent
    }

    pub fn is_killed(&self) -> bool {
        !self.inconsistent.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("failed to read database {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse database {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The aggregate result of one mutation campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    oracle_directory: PathBuf,
    base_snapshot_id: String,
    entries: Vec<DatabaseEntry>,
}

impl Database {
    pub fn new(
        oracle_directory: PathBuf,
        base_snapshot_id: &str,
        entries: Vec<DatabaseEntry>,
    ) -> Self {
        Self {
            oracle_directory,
            base_snapshot_id: base_snapshot_id.to_string(),
            entries,
        }
    }

    pub fn oracle_directory(&self) -> &Path {
        &self.oracle_directory
    }

    pub fn base_snapshot_id(&self) -> &str {
        &self.base_snapshot_id
    }

    pub fn entries(&self) -> &[DatabaseEntry] {
        &self.entries
    }

    pub fn entry_for(&self, diff: &str) -> Option<&DatabaseEntry> {
        self.entries.iter().find(|e| e.diff() == diff)
    }

    pub fn save(&self, path: &Path) -> Result<(), DatabaseError> {
        let jsn = serde_json::to_string_pretty(self).map_err(|source| DatabaseError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, jsn).map_err(|source| DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let text = fs::read_to_string(path).map_err(|source| DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DatabaseError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
