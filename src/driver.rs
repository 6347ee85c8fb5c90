//! Batch driver and the two-phase scan/commit workflow.
//!
//! A scan walks every library and writes a candidate list without deleting
//! anything. A commit deletes exactly what a (possibly hand-edited) candidate
//! list names, and nothing else. The two never happen in the same run.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::candidates::{
    failures_path_for, read_candidates, read_results, write_candidates, write_failures,
    write_results, FailureRow,
};
use crate::config::SweepConfig;
use crate::error::{Result, SweepError};
use crate::inventory::{read_libraries, LibraryRow};
use crate::models::{format_elapsed, Candidate, DeletionResult, Drive, Provenance};
use crate::planner::DeletionPlanner;
use crate::throttle::ThrottledClient;
use crate::transport::Transport;
use crate::walker::{TreeWalker, ROOT_ITEM_ID};

/// Which half of the workflow to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Walk every library in `libraries_path` and write candidates for review.
    Scan {
        libraries_path: PathBuf,
        candidates_path: PathBuf,
        summary_path: PathBuf,
    },
    /// Delete the candidates in `candidates_path`.
    Commit {
        candidates_path: PathBuf,
        results_path: PathBuf,
        /// Scan summary used to fill in `folders_before`.
        scan_summary_path: Option<PathBuf>,
    },
}

/// A library that was not walked, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLibrary {
    pub site_name: String,
    pub library_name: String,
    pub reason: String,
}

/// Everything a scan produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub candidates: Vec<Candidate>,
    pub results: Vec<DeletionResult>,
    pub skipped: Vec<SkippedLibrary>,
}

/// Everything a commit produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub results: Vec<DeletionResult>,
    pub failures: Vec<FailureRow>,
    /// Top-level candidates left alone because of top-level protection.
    pub protected: Vec<Candidate>,
}

/// Runs walks and deletions for many libraries through one throttled client.
pub struct BatchDriver<T> {
    client: ThrottledClient<T>,
    config: SweepConfig,
}

impl<T: Transport> BatchDriver<T> {
    pub fn new(client: ThrottledClient<T>, config: SweepConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &ThrottledClient<T> {
        &self.client
    }

    /// Run one half of the workflow and write its artifacts.
    pub async fn run(&self, mode: &Mode) -> Result<Vec<DeletionResult>> {
        let started = Instant::now();

        let results = match mode {
            Mode::Scan {
                libraries_path,
                candidates_path,
                summary_path,
            } => {
                let libraries = read_libraries(libraries_path)?;
                info!("Loaded {} libraries from {}", libraries.len(), libraries_path.display());

                let report = self.scan(&libraries).await;

                // Save the candidate list for review
                write_candidates(candidates_path, &report.candidates)?;
                write_results(summary_path, &report.results)?;
                info!(
                    candidates = report.candidates.len(),
                    skipped = report.skipped.len(),
                    "Candidate list saved: {} (review it, then run commit)",
                    candidates_path.display()
                );
                report.results
            }
            Mode::Commit {
                candidates_path,
                results_path,
                scan_summary_path,
            } => {
                // Validate the whole list before anything is deleted
                let candidates = read_candidates(candidates_path)?;
                info!("Loaded {} candidates from {}", candidates.len(), candidates_path.display());

                let scan_summary = match scan_summary_path {
                    Some(path) => read_results(path)?,
                    None => Vec::new(),
                };

                let report = self.commit(candidates, &scan_summary).await;
                write_results(results_path, &report.results)?;
                info!("Deletion results saved: {}", results_path.display());

                if !report.failures.is_empty() {
                    let failures_path = failures_path_for(results_path);
                    write_failures(&failures_path, &report.failures)?;
                    warn!(
                        failures = report.failures.len(),
                        "Failed deletions saved: {}",
                        failures_path.display()
                    );
                }
                report.results
            }
        };

        info!(
            calls = self.client.throttle().calls(),
            "Finished in {}",
            format_elapsed(started.elapsed())
        );
        Ok(results)
    }

    /// Resolve a site/list pair to the id of its drive.
    pub async fn resolve_drive(&self, site_id: &str, library_id: &str) -> Result<String> {
        let url = format!("{}/sites/{}/lists/{}/drive", self.config.base(), site_id, library_id);
        let response = self.client.fetch(&url).await?;
        if response.status != 200 {
            return Err(SweepError::ApiError {
                status: response.status,
                message: response.error_message(),
            });
        }
        let drive: Drive = response.json()?;
        if drive.id.is_empty() {
            return Err(SweepError::ApiError {
                status: response.status,
                message: "drive id missing from response".to_string(),
            });
        }
        Ok(drive.id)
    }

    /// Walk every library and collect candidates. Nothing is deleted.
    ///
    /// A library whose ids are missing or cannot be resolved is skipped, as is
    /// a second row for a drive already walked; the rest of the batch carries on.
    pub async fn scan(&self, libraries: &[LibraryRow]) -> ScanReport {
        let mut report = ScanReport::default();
        let walker = TreeWalker::new(&self.client, self.config.base(), &self.config.walk);
        let mut scanned_drives: HashSet<String> = HashSet::new();

        for (idx, row) in libraries.iter().enumerate() {
            let provenance = Provenance {
                site_name: row.site_name().to_string(),
                library_name: row.library_name().to_string(),
            };
            info!(
                "Processing library {}/{}: {} ({})",
                idx + 1,
                libraries.len(),
                provenance.library_name,
                provenance.site_name
            );

            // Two rows can name the same library, e.g. a list id with and without braces.
            let resolved = self.resolve_row(row).await.and_then(|drive_id| {
                if scanned_drives.insert(drive_id.clone()) {
                    Ok(drive_id)
                } else {
                    Err(format!("drive {} already scanned (library listed twice)", drive_id))
                }
            });
            let drive_id = match resolved {
                Ok(drive_id) => drive_id,
                Err(reason) => {
                    warn!("  Skipping {}: {}", provenance.library_name, reason);
                    report.skipped.push(SkippedLibrary {
                        site_name: provenance.site_name,
                        library_name: provenance.library_name,
                        reason,
                    });
                    continue;
                }
            };

            // Walk from the library root
            let outcome = walker.walk(&drive_id, ROOT_ITEM_ID).await;
            info!("  Found {} total folders.", outcome.folders.len());
            info!("  Found {} empty folders (childCount == 0).", outcome.matches.len());
            if !outcome.is_complete() {
                warn!(
                    truncated = outcome.truncated.len(),
                    "  Some subtrees could not be listed; counts are partial"
                );
            }

            let folders_before = outcome.folders.len() as u64;
            report.results.push(DeletionResult {
                site_name: provenance.site_name.clone(),
                library_name: provenance.library_name.clone(),
                library_url: row.library_url.clone().unwrap_or_default(),
                drive_id: drive_id.clone(),
                folders_before: Some(folders_before),
                empty_folders_found: outcome.matches.len() as u64,
                folders_deleted: 0,
                folders_failed: 0,
                folders_after: Some(folders_before),
                truncated_subtrees: outcome.truncated.len() as u64,
            });
            report.candidates.extend(
                outcome
                    .matches
                    .iter()
                    .map(|node| Candidate::from_node(node, &drive_id, &provenance)),
            );
        }

        report
    }

    async fn resolve_row(&self, row: &LibraryRow) -> std::result::Result<String, String> {
        let (site_id, library_id) = row.ids()?;
        self.resolve_drive(&site_id, &library_id)
            .await
            .map_err(|e| format!("drive_id not available ({})", e))
    }

    /// Delete the given candidates, drive by drive, deepest first.
    ///
    /// The list is trusted as-is; only the top-level protection rule is
    /// re-applied. `scan_summary` supplies folder totals when available.
    pub async fn commit(&self, candidates: Vec<Candidate>, scan_summary: &[DeletionResult]) -> CommitReport {
        let mut report = CommitReport::default();
        let planner = DeletionPlanner::new(&self.client, self.config.base());

        let summary_by_drive: HashMap<&str, &DeletionResult> = scan_summary
            .iter()
            .map(|r| (r.drive_id.as_str(), r))
            .collect();

        let groups = group_by_drive(candidates);
        let total = groups.len();

        for (idx, (drive_id, group)) in groups.into_iter().enumerate() {
            let provenance = group
                .first()
                .map(|c| Provenance {
                    site_name: c.site_name.clone(),
                    library_name: c.library_name.clone(),
                })
                .unwrap_or_default();
            info!(
                "Processing library {}/{}: {} ({})",
                idx + 1,
                total,
                provenance.library_name,
                provenance.site_name
            );

            let found = group.len() as u64;
            let (protected, deletable): (Vec<Candidate>, Vec<Candidate>) = group
                .into_iter()
                .partition(|c| self.config.walk.protect_top_level && c.depth == 0);
            if !protected.is_empty() {
                warn!(
                    protected = protected.len(),
                    "  Leaving top-level folders in place (top-level protection is on)"
                );
            }

            // Delete and recalculate folder count
            let outcome = planner.plan_and_execute(&drive_id, deletable).await;
            let scanned = summary_by_drive.get(drive_id.as_str());
            let folders_before = scanned.and_then(|r| r.folders_before);
            let folders_after = folders_before.map(|before| before.saturating_sub(outcome.deleted_count()));
            if let Some(after) = folders_after {
                info!("  New folder count (calculated): {}", after);
            }

            let result = DeletionResult {
                site_name: provenance.site_name,
                library_name: provenance.library_name,
                library_url: scanned.map(|r| r.library_url.clone()).unwrap_or_default(),
                drive_id,
                folders_before,
                empty_folders_found: found,
                folders_deleted: outcome.deleted_count(),
                folders_failed: outcome.failed_count(),
                folders_after,
                truncated_subtrees: scanned.map(|r| r.truncated_subtrees).unwrap_or(0),
            };

            report
                .failures
                .extend(outcome.failures.iter().map(|f| FailureRow::new(&result, f)));
            report.protected.extend(protected);
            report.results.push(result);
        }

        report
    }
}

/// Group candidates by drive, keeping drives and candidates in list order.
fn group_by_drive(candidates: Vec<Candidate>) -> Vec<(String, Vec<Candidate>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Candidate>)> = Vec::new();

    for candidate in candidates {
        match index.get(&candidate.drive_id) {
            Some(&i) => groups[i].1.push(candidate),
            None => {
                index.insert(candidate.drive_id.clone(), groups.len());
                groups.push((candidate.drive_id.clone(), vec![candidate]));
            }
        }
    }

    groups
}
