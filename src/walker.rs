//! Depth-first walk of a drive's folder tree.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::WalkConfig;
use crate::error::{Result, SweepError};
use crate::models::{ChildrenPage, DriveItem, Node};
use crate::throttle::ThrottledClient;
use crate::transport::Transport;

/// Fields requested from every children listing.
const CHILDREN_SELECT: &str = "id,name,folder,parentReference,size";

/// Item id Graph uses for a drive's root folder.
pub const ROOT_ITEM_ID: &str = "root";

/// What a walk found.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Every folder seen, empty or not.
    pub folders: Vec<Node>,
    /// Empty folders eligible for deletion.
    pub matches: Vec<Node>,
    /// Items whose children could only be partly listed, or not at all.
    pub truncated: Vec<String>,
}

impl WalkOutcome {
    pub fn is_complete(&self) -> bool {
        self.truncated.is_empty()
    }
}

/// Children of one item, possibly cut short by a failed page.
#[derive(Debug, Default)]
pub struct ChildListing {
    pub items: Vec<DriveItem>,
    /// Why listing stopped early, if it did.
    pub error: Option<SweepError>,
}

/// Walks folder trees through a [`ThrottledClient`].
///
/// Emptiness comes from `folder.childCount` in the parent's listing, so each
/// folder costs exactly one listing (plus pagination) and empty folders cost
/// nothing beyond their parent's.
pub struct TreeWalker<'a, T> {
    client: &'a ThrottledClient<T>,
    base: &'a str,
    config: &'a WalkConfig,
}

impl<'a, T: Transport> TreeWalker<'a, T> {
    pub fn new(client: &'a ThrottledClient<T>, base: &'a str, config: &'a WalkConfig) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/'),
            config,
        }
    }

    /// Walk the subtree under `root_item_id`.
    ///
    /// Children of the root sit at depth 0. A failed listing truncates only the
    /// subtree it belongs to; the rest of the tree is still walked.
    pub async fn walk(&self, drive_id: &str, root_item_id: &str) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending: Vec<(String, u32)> = vec![(root_item_id.to_string(), 0)];

        while let Some((item_id, depth)) = pending.pop() {
            // List every page of this folder
            let listing = self.list_children(drive_id, &item_id).await;

            // Pages that did arrive are still classified; the node is only partly known.
            if let Some(e) = &listing.error {
                warn!(
                    drive_id,
                    item_id = %item_id,
                    depth,
                    listed = listing.items.len(),
                    error = %e,
                    "listing failed, subtree incomplete"
                );
                outcome.truncated.push(item_id.clone());
            }

            let mut descend = Vec::new();
            for item in &listing.items {
                let Some(node) = Node::from_item(item, depth) else {
                    continue;
                };
                // Paging can repeat an item when the folder changes mid-listing.
                if !seen.insert(node.id.clone()) {
                    debug!(drive_id, item_id = %node.id, "item already seen, skipped");
                    continue;
                }

                if node.is_empty() {
                    if depth == 0 && self.config.protect_top_level {
                        debug!(drive_id, item_id = %node.id, name = %node.name, "top-level empty folder protected");
                    } else {
                        outcome.matches.push(node.clone());
                    }
                } else {
                    descend.push((node.id.clone(), depth + 1));
                }

                outcome.folders.push(node);
            }

            // Reverse so siblings are visited in listing order.
            pending.extend(descend.into_iter().rev());
        }

        outcome
    }

    /// List the children of an item, following `@odata.nextLink` until the last page.
    ///
    /// Items from pages fetched before a failure are kept alongside the error.
    pub async fn list_children(&self, drive_id: &str, item_id: &str) -> ChildListing {
        let mut url = format!(
            "{}/drives/{}/items/{}/children?$top={}&$select={}",
            self.base, drive_id, item_id, self.config.page_size, CHILDREN_SELECT
        );
        let mut listing = ChildListing::default();

        loop {
            let page = match self.fetch_page(&url).await {
                Ok(page) => page,
                Err(e) => {
                    listing.error = Some(e);
                    break;
                }
            };
            listing.items.extend(page.value);

            // Follow the next link until the last page
            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }

        listing
    }

    async fn fetch_page(&self, url: &str) -> Result<ChildrenPage> {
        let response = self.client.fetch(url).await?;
        if response.status != 200 {
            return Err(SweepError::ApiError {
                status: response.status,
                message: response.error_message(),
            });
        }
        response.json()
    }
}
