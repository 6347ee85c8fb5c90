//! drive_sweep - find and remove empty folders in SharePoint document libraries.
//!
//! This library provides functionality to:
//! - Walk every folder of a Microsoft Graph drive, paging and throttling as it goes
//! - Classify empty folders from the `childCount` already present in each listing
//! - Write the empty folders to a reviewable candidate list
//! - Delete a reviewed candidate list deepest-first, tolerating per-item failures
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use drive_sweep::{
//!     Authenticator, ClientCredential, GraphTransport, SweepConfig, Throttle, ThrottledClient,
//!     TreeWalker,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::new(
//!         "tenant-id".to_string(),
//!         "client-id".to_string(),
//!         ClientCredential::Secret("client-secret".to_string()),
//!     )?;
//!     let config = SweepConfig::default();
//!     let throttle = Arc::new(Throttle::new(config.throttle.clone()));
//!     let client = ThrottledClient::new(GraphTransport::new(auth), throttle);
//!
//!     let walker = TreeWalker::new(&client, config.base(), &config.walk);
//!     let outcome = walker.walk("drive-id", "root").await;
//!     for node in outcome.matches {
//!         println!("{}\t{}\t{}", node.depth, node.id, node.name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod candidates;
pub mod config;
pub mod driver;
pub mod error;
pub mod ids;
pub mod inventory;
pub mod logging;
pub mod models;
pub mod planner;
pub mod throttle;
pub mod transport;
pub mod walker;

// Re-exports for convenience
pub use auth::{Authenticator, ClientCredential};
pub use config::{SweepConfig, ThrottleConfig, WalkConfig};
pub use driver::{BatchDriver, Mode};
pub use error::{Result, SweepError};
pub use models::{Candidate, DeletionResult, Node};
pub use planner::DeletionPlanner;
pub use throttle::{Throttle, ThrottledClient};
pub use transport::{GraphResponse, GraphTransport, Transport};
pub use walker::{TreeWalker, WalkOutcome};
