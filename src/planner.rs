//! Deepest-first deletion of reviewed candidates.

use tracing::{info, warn};

use crate::models::{Candidate, DeletionFailure};
use crate::throttle::ThrottledClient;
use crate::transport::Transport;

/// Status Graph returns for a successful item delete.
const STATUS_NO_CONTENT: u16 = 204;

/// What happened to one drive's candidates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeletionOutcome {
    /// Ids deleted, in the order the delete calls were made.
    pub deleted: Vec<String>,
    pub failures: Vec<DeletionFailure>,
}

impl DeletionOutcome {
    pub fn deleted_count(&self) -> u64 {
        self.deleted.len() as u64
    }

    pub fn failed_count(&self) -> u64 {
        self.failures.len() as u64
    }
}

/// Sort by depth, deepest first. Candidates at equal depth keep their order.
pub fn plan(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.depth.cmp(&a.depth));
    candidates
}

/// Orders candidates deepest-first and deletes them one at a time.
pub struct DeletionPlanner<'a, T> {
    client: &'a ThrottledClient<T>,
    base: &'a str,
}

impl<'a, T: Transport> DeletionPlanner<'a, T> {
    pub fn new(client: &'a ThrottledClient<T>, base: &'a str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/'),
        }
    }

    /// Delete every candidate of one drive.
    ///
    /// Deletes are issued sequentially so a parent is never removed before its
    /// children have been attempted. A failure is recorded and the next
    /// candidate is tried.
    pub async fn plan_and_execute(&self, drive_id: &str, candidates: Vec<Candidate>) -> DeletionOutcome {
        let mut outcome = DeletionOutcome::default();

        for candidate in plan(candidates) {
            let url = format!("{}/drives/{}/items/{}", self.base, drive_id, candidate.id);

            // Anything other than 204 counts as a failure, 404 included
            match self.client.delete(&url).await {
                Ok(response) if response.status == STATUS_NO_CONTENT => {
                    info!(drive_id, item_id = %candidate.id, depth = candidate.depth, "Deleted: {}", candidate.name);
                    outcome.deleted.push(candidate.id);
                }
                Ok(response) => {
                    let reason = response.error_message();
                    warn!(drive_id, item_id = %candidate.id, status = response.status, "Failed: {} ({})", candidate.name, reason);
                    outcome.failures.push(DeletionFailure {
                        id: candidate.id,
                        name: candidate.name,
                        depth: candidate.depth,
                        status: Some(response.status),
                        reason,
                    });
                }
                Err(e) => {
                    warn!(drive_id, item_id = %candidate.id, error = %e, "Failed: {}", candidate.name);
                    outcome.failures.push(DeletionFailure {
                        id: candidate.id,
                        name: candidate.name,
                        depth: candidate.depth,
                        status: None,
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}
