//! CSV artifacts: the reviewed candidate list, per-library summaries and
//! deletion failures.
//!
//! The candidate list is the only thing a commit pass trusts, so it carries a
//! `schema_version` column on every row and is validated in full before any
//! delete is issued. Removing rows during review is expected; changing the
//! columns is not.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::models::{Candidate, DeletionFailure, DeletionResult};

/// Version written to and required from every candidate row.
pub const CANDIDATE_SCHEMA_VERSION: u32 = 1;

const CANDIDATE_HEADERS: [&str; 8] = [
    "schema_version",
    "id",
    "name",
    "depth",
    "drive_id",
    "parent_id",
    "site_name",
    "library_name",
];

const RESULT_HEADERS: [&str; 10] = [
    "site_name",
    "library_name",
    "library_url",
    "drive_id",
    "folders_before",
    "empty_folders_found",
    "folders_deleted",
    "folders_failed",
    "folders_after",
    "truncated_subtrees",
];

const FAILURE_HEADERS: [&str; 8] = [
    "site_name",
    "library_name",
    "drive_id",
    "id",
    "name",
    "depth",
    "status",
    "reason",
];

#[derive(Debug, Serialize)]
struct CandidateRow<'a> {
    schema_version: u32,
    id: &'a str,
    name: &'a str,
    depth: u32,
    drive_id: &'a str,
    parent_id: &'a str,
    site_name: &'a str,
    library_name: &'a str,
}

/// Candidate row as typed by a reviewer; every field is checked by hand.
#[derive(Debug, Deserialize)]
struct RawCandidateRow {
    schema_version: String,
    id: String,
    #[serde(default)]
    name: String,
    depth: String,
    drive_id: String,
    #[serde(default)]
    parent_id: String,
    #[serde(default)]
    site_name: String,
    #[serde(default)]
    library_name: String,
}

/// A failed delete with the library it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRow {
    pub site_name: String,
    pub library_name: String,
    pub drive_id: String,
    pub id: String,
    pub name: String,
    pub depth: u32,
    pub status: Option<u16>,
    pub reason: String,
}

impl FailureRow {
    pub fn new(result: &DeletionResult, failure: &DeletionFailure) -> Self {
        Self {
            site_name: result.site_name.clone(),
            library_name: result.library_name.clone(),
            drive_id: result.drive_id.clone(),
            id: failure.id.clone(),
            name: failure.name.clone(),
            depth: failure.depth,
            status: failure.status,
            reason: failure.reason.clone(),
        }
    }
}

fn writer(path: &Path, headers: &[&str]) -> Result<csv::Writer<std::fs::File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.write_record(headers)?;
    Ok(wtr)
}

/// Write the candidate list for review.
pub fn write_candidates(path: &Path, candidates: &[Candidate]) -> Result<()> {
    let mut wtr = writer(path, &CANDIDATE_HEADERS)?;
    for c in candidates {
        wtr.serialize(CandidateRow {
            schema_version: CANDIDATE_SCHEMA_VERSION,
            id: &c.id,
            name: &c.name,
            depth: c.depth,
            drive_id: &c.drive_id,
            parent_id: &c.parent_id,
            site_name: &c.site_name,
            library_name: &c.library_name,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a reviewed candidate list, rejecting it whole if any row breaks the schema.
pub fn read_candidates(path: &Path) -> Result<Vec<Candidate>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    for (idx, row) in rdr.deserialize::<RawCandidateRow>().enumerate() {
        let row_no = idx + 1;
        let raw = row?;
        let schema_error = |message: String| SweepError::CandidateSchemaError {
            row: row_no,
            message,
        };

        if raw.schema_version.parse::<u32>().ok() != Some(CANDIDATE_SCHEMA_VERSION) {
            return Err(schema_error(format!(
                "unsupported schema_version '{}', expected {}",
                raw.schema_version, CANDIDATE_SCHEMA_VERSION
            )));
        }
        if raw.id.is_empty() {
            return Err(schema_error("id is empty".to_string()));
        }
        if raw.drive_id.is_empty() {
            return Err(schema_error("drive_id is empty".to_string()));
        }
        let depth = raw
            .depth
            .parse::<u32>()
            .map_err(|_| schema_error(format!("depth '{}' is not a non-negative integer", raw.depth)))?;
        if !seen.insert((raw.drive_id.clone(), raw.id.clone())) {
            return Err(schema_error(format!("duplicate candidate {}", raw.id)));
        }

        candidates.push(Candidate {
            id: raw.id,
            name: raw.name,
            depth,
            drive_id: raw.drive_id,
            parent_id: raw.parent_id,
            site_name: raw.site_name,
            library_name: raw.library_name,
        });
    }

    Ok(candidates)
}

/// Write per-library summaries.
pub fn write_results(path: &Path, results: &[DeletionResult]) -> Result<()> {
    let mut wtr = writer(path, &RESULT_HEADERS)?;
    for result in results {
        wtr.serialize(result)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read per-library summaries, e.g. the one a scan left behind.
pub fn read_results(path: &Path) -> Result<Vec<DeletionResult>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut results = Vec::new();
    for row in rdr.deserialize() {
        results.push(row?);
    }
    Ok(results)
}

/// Write failed deletes for follow-up.
pub fn write_failures(path: &Path, failures: &[FailureRow]) -> Result<()> {
    let mut wtr = writer(path, &FAILURE_HEADERS)?;
    for failure in failures {
        wtr.serialize(failure)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `<dir>/empty_folder_deletion_results_<timestamp>.csv`
pub fn timestamped_results_path(dir: &Path) -> PathBuf {
    dir.join(format!(
        "empty_folder_deletion_results_{}.csv",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Failures file written next to a results file: `results.csv` -> `results_failures.csv`.
pub fn failures_path_for(results_path: &Path) -> PathBuf {
    let stem = results_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    results_path.with_file_name(format!("{}_failures.csv", stem))
}
