//! Per-item results of a run, collected instead of printed-and-forgotten so
//! callers can inspect failures or render the whole run as JSON.

use crate::extractor::ExtractStats;
use crate::file_category::Category;
use crate::file_organizer::PlannedMove;
use crate::report::Report;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct MoveRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRecord {
    pub archive: PathBuf,
    pub target: PathBuf,
    #[serde(flatten)]
    pub stats: ExtractStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorruptRecord {
    pub archive: PathBuf,
    pub reason: String,
    pub deleted: bool,
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// RFC 3339 timestamp of when the run started.
    pub started_at: String,
    pub root: PathBuf,
    pub dry_run: bool,
    /// Moves that would happen; only filled in a dry run.
    pub planned: Vec<PlannedMove>,
    pub moved: Vec<MoveRecord>,
    /// Files that vanished before they could be moved.
    pub missing: Vec<PathBuf>,
    pub move_failures: Vec<FailureRecord>,
    pub removed_dirs: Vec<PathBuf>,
    pub extracted: Vec<ExtractionRecord>,
    pub corrupt: Vec<CorruptRecord>,
    pub extract_failures: Vec<FailureRecord>,
    pub report: Option<Report>,
}

impl RunSummary {
    pub fn new(root: &Path, dry_run: bool) -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            root: root.to_path_buf(),
            dry_run,
            planned: Vec::new(),
            moved: Vec::new(),
            missing: Vec::new(),
            move_failures: Vec::new(),
            removed_dirs: Vec::new(),
            extracted: Vec::new(),
            corrupt: Vec::new(),
            extract_failures: Vec::new(),
            report: None,
        }
    }

    /// True if any file could not be moved or any archive could not be
    /// unpacked.
    pub fn has_failures(&self) -> bool {
        !self.missing.is_empty()
            || !self.move_failures.is_empty()
            || !self.corrupt.is_empty()
            || !self.extract_failures.is_empty()
    }

    /// Number of moved (or, in a dry run, planned) files per category folder.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let categories = if self.dry_run {
            self.planned.iter().map(|p| p.category).collect::<Vec<_>>()
        } else {
            self.moved.iter().map(|m| m.category).collect()
        };

        let mut counts = BTreeMap::new();
        for category in categories {
            *counts.entry(category.dir_name().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Serializes the summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Could not serialize summary: {}", e))
    }
}
