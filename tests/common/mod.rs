//! In-memory Graph used by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use drive_sweep::config::{SweepConfig, ThrottleConfig, WalkConfig};
use drive_sweep::error::{Result, SweepError};
use drive_sweep::{GraphResponse, Throttle, ThrottledClient, Transport};
use serde_json::{json, Value};

pub const BASE: &str = "https://graph.test/v1.0";

/// How the fake answers a children listing for one item.
#[derive(Clone)]
pub enum Listing {
    /// Pages of children; every page but the last carries a next link.
    Pages(Vec<Vec<Value>>),
    /// The first page fails with this status.
    Status(u16),
    /// Every page in `pages` succeeds, the page after them fails with `status`.
    FailsAfter { pages: Vec<Vec<Value>>, status: u16 },
}

#[derive(Default)]
pub struct FakeGraph {
    listings: HashMap<String, Listing>,
    drives: HashMap<(String, String), String>,
    delete_status: HashMap<String, u16>,
    /// Every Nth request is answered with 429 and `Retry-After: 5`.
    throttle_every: Option<u64>,
    requests: AtomicU64,
    throttled: AtomicU64,
    log: Mutex<Vec<(String, String)>>,
}

impl FakeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(mut self, item_id: &str, children: Vec<Value>) -> Self {
        self.listings
            .insert(item_id.to_string(), Listing::Pages(vec![children]));
        self
    }

    pub fn listing(mut self, item_id: &str, listing: Listing) -> Self {
        self.listings.insert(item_id.to_string(), listing);
        self
    }

    pub fn drive(mut self, site_id: &str, list_id: &str, drive_id: &str) -> Self {
        self.drives.insert(
            (site_id.to_string(), list_id.to_string()),
            drive_id.to_string(),
        );
        self
    }

    pub fn delete_returns(mut self, item_id: &str, status: u16) -> Self {
        self.delete_status.insert(item_id.to_string(), status);
        self
    }

    pub fn throttle_every(mut self, n: u64) -> Self {
        self.throttle_every = Some(n);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every request made, as `(method, url)`.
    pub fn log(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }

    /// Item ids deleted, in call order (throttled attempts excluded).
    pub fn deletes(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(method, _)| method == "DELETE")
            .map(|(_, url)| url.rsplit('/').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn throttled_count(&self) -> u64 {
        self.throttled.load(Ordering::SeqCst)
    }

    /// Returns a 429 if this request is one the fake throttles.
    fn maybe_throttle(&self, method: &str, url: &str) -> Option<GraphResponse> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(every) = self.throttle_every {
            if n % every == 0 {
                self.throttled.fetch_add(1, Ordering::SeqCst);
                return Some(GraphResponse::throttled(Some(5)));
            }
        }
        self.log
            .lock()
            .unwrap()
            .push((method.to_string(), url.to_string()));
        None
    }

    fn children_response(&self, url: &str) -> GraphResponse {
        let path = url.split('?').next().unwrap_or_default();
        let item_id = path
            .trim_end_matches("/children")
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let page: usize = url
            .split("page=")
            .nth(1)
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);

        let (pages, fail_status) = match self.listings.get(item_id) {
            None => (vec![Vec::new()], None),
            Some(Listing::Status(status)) => return GraphResponse::new(*status, error_body()),
            Some(Listing::Pages(pages)) => (pages.clone(), None),
            Some(Listing::FailsAfter { pages, status }) => (pages.clone(), Some(*status)),
        };

        if page >= pages.len() {
            return match fail_status {
                Some(status) => GraphResponse::new(status, error_body()),
                None => GraphResponse::new(404, error_body()),
            };
        }

        let mut body = json!({ "value": pages[page] });
        if page + 1 < pages.len() || fail_status.is_some() {
            body["@odata.nextLink"] = json!(format!(
                "{}/drives/d/items/{}/children?page={}",
                BASE,
                item_id,
                page + 1
            ));
        }
        GraphResponse::new(200, body.to_string())
    }

    fn drive_response(&self, url: &str) -> GraphResponse {
        let parts: Vec<&str> = url.split('/').collect();
        let site = parts.iter().position(|p| *p == "sites").map(|i| parts[i + 1]);
        let list = parts.iter().position(|p| *p == "lists").map(|i| parts[i + 1]);
        match (site, list) {
            (Some(site), Some(list)) => match self.drives.get(&(site.to_string(), list.to_string())) {
                Some(drive_id) => GraphResponse::new(200, json!({ "id": drive_id }).to_string()),
                None => GraphResponse::new(404, error_body()),
            },
            _ => GraphResponse::new(400, error_body()),
        }
    }
}

fn error_body() -> String {
    json!({ "error": { "code": "itemNotFound", "message": "The resource could not be found." } })
        .to_string()
}

#[async_trait]
impl Transport for FakeGraph {
    async fn get(&self, url: &str) -> Result<GraphResponse> {
        if let Some(throttled) = self.maybe_throttle("GET", url) {
            return Ok(throttled);
        }
        if url.contains("/children") {
            Ok(self.children_response(url))
        } else if url.ends_with("/drive") {
            Ok(self.drive_response(url))
        } else {
            Err(SweepError::ApiError {
                status: 0,
                message: format!("unexpected GET {}", url),
            })
        }
    }

    async fn delete(&self, url: &str) -> Result<GraphResponse> {
        if let Some(throttled) = self.maybe_throttle("DELETE", url) {
            return Ok(throttled);
        }
        let item_id = url.rsplit('/').next().unwrap_or_default();
        let status = self.delete_status.get(item_id).copied().unwrap_or(204);
        if status == 204 {
            Ok(GraphResponse::new(204, ""))
        } else {
            Ok(GraphResponse::new(status, error_body()))
        }
    }
}

pub fn folder(id: &str, name: &str, child_count: u64, parent: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "folder": { "childCount": child_count },
        "parentReference": { "id": parent },
        "size": 0
    })
}

pub fn file(id: &str, name: &str, parent: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "file": { "mimeType": "text/plain" },
        "parentReference": { "id": parent },
        "size": 12
    })
}

pub fn config(protect_top_level: bool) -> SweepConfig {
    SweepConfig {
        graph_base: BASE.to_string(),
        throttle: ThrottleConfig {
            pause_every: 0,
            pause: Duration::from_secs(2),
            default_retry_after: Duration::from_secs(10),
        },
        walk: WalkConfig {
            page_size: 100,
            protect_top_level,
        },
    }
}

pub fn client(graph: &Arc<FakeGraph>, config: &SweepConfig) -> ThrottledClient<Arc<FakeGraph>> {
    ThrottledClient::new(
        Arc::clone(graph),
        Arc::new(Throttle::new(config.throttle.clone())),
    )
}

/// `root/{A(empty), B/{C(empty), D(childCount=2, lists nothing)}}`
pub fn stale_metadata_tree() -> FakeGraph {
    FakeGraph::new()
        .children(
            "root",
            vec![folder("A", "A", 0, "root"), folder("B", "B", 2, "root")],
        )
        .children(
            "B",
            vec![folder("C", "C", 0, "B"), folder("D", "D", 2, "B")],
        )
        .children("D", Vec::new())
}
