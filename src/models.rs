//! Data models for Graph API responses and the records a sweep produces.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A drive item as returned by a `children` listing.
///
/// Only the fields requested through `$select` are modelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub folder: Option<FolderFacet>,
    #[serde(default)]
    pub parent_reference: Option<ParentReference>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl DriveItem {
    /// Whether the item carries the folder facet.
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    /// Child count reported by the listing, zero when the facet omits it.
    pub fn child_count(&self) -> Option<u64> {
        self.folder.as_ref().map(|f| f.child_count.unwrap_or(0))
    }

    pub fn parent_id(&self) -> String {
        self.parent_reference
            .as_ref()
            .and_then(|p| p.id.clone())
            .unwrap_or_default()
    }
}

/// Folder facet of a drive item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: Option<u64>,
}

/// Parent reference of a drive item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub drive_id: Option<String>,
}

/// One page of a `children` listing.
#[derive(Debug, Deserialize)]
pub struct ChildrenPage {
    #[serde(default)]
    pub value: Vec<DriveItem>,
    #[serde(default, rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Drive metadata returned by `sites/{site}/lists/{list}/drive`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub drive_type: Option<String>,
}

/// Graph error envelope.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// A folder seen during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    /// Distance from the walk root; children of the root are at depth 0.
    pub depth: u32,
    pub child_count: u64,
    pub size: Option<u64>,
}

impl Node {
    pub fn from_item(item: &DriveItem, depth: u32) -> Option<Self> {
        let child_count = item.child_count()?;
        Some(Self {
            id: item.id.clone(),
            name: item.name.clone(),
            parent_id: item.parent_id(),
            depth,
            child_count,
            size: item.size,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.child_count == 0
    }
}

/// The library a candidate was found in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Provenance {
    pub site_name: String,
    pub library_name: String,
}

/// An empty folder selected for deletion, with enough identity to act on it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub depth: u32,
    pub drive_id: String,
    pub parent_id: String,
    pub site_name: String,
    pub library_name: String,
}

impl Candidate {
    pub fn from_node(node: &Node, drive_id: &str, provenance: &Provenance) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            depth: node.depth,
            drive_id: drive_id.to_string(),
            parent_id: node.parent_id.clone(),
            site_name: provenance.site_name.clone(),
            library_name: provenance.library_name.clone(),
        }
    }
}

/// A candidate whose delete call did not return 204.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub id: String,
    pub name: String,
    pub depth: u32,
    /// HTTP status, or `None` when the request never got a response.
    pub status: Option<u16>,
    pub reason: String,
}

/// Per-library summary of a scan or commit pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionResult {
    pub site_name: String,
    pub library_name: String,
    #[serde(default)]
    pub library_url: String,
    pub drive_id: String,
    /// Folders seen by the scan; unknown when committing without a scan summary.
    pub folders_before: Option<u64>,
    pub empty_folders_found: u64,
    pub folders_deleted: u64,
    pub folders_failed: u64,
    /// `folders_before - folders_deleted`, computed rather than re-scanned.
    pub folders_after: Option<u64>,
    /// Subtrees whose listing failed; counts beyond them are unknown.
    #[serde(default)]
    pub truncated_subtrees: u64,
}

/// Wall-clock time of a run, e.g. `850ms`, `12.4s`, `3m 07s`, `2h 05m 09s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, secs) = (total / 3600, total % 3600 / 60, total % 60);

    match (hours, minutes, secs) {
        (0, 0, 0) => format!("{}ms", elapsed.subsec_millis()),
        (0, 0, _) => format!("{}.{}s", secs, elapsed.subsec_millis() / 100),
        (0, _, _) => format!("{}m {:02}s", minutes, secs),
        _ => format!("{}h {:02}m {:02}s", hours, minutes, secs),
    }
}
