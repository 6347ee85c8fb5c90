//! Proactive pausing and 429 backoff shared by every outbound call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ThrottleConfig;
use crate::error::Result;
use crate::transport::{GraphResponse, Transport};

/// Call counter plus the pause policy applied to it.
#[derive(Debug)]
pub struct Throttle {
    config: ThrottleConfig,
    calls: AtomicU64,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            calls: AtomicU64::new(0),
        }
    }

    /// Total calls recorded so far, retries included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Count one call; returns true when the proactive pause is due.
    pub fn record_call(&self) -> bool {
        let count = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.config.pause_every != 0 && count % self.config.pause_every == 0
    }

    /// Wait for a 429, honouring the server hint when there is one.
    pub fn retry_delay(&self, response: &GraphResponse) -> Duration {
        response
            .retry_after
            .map(Duration::from_secs)
            .unwrap_or(self.config.default_retry_after)
    }

    pub fn pause(&self) -> Duration {
        self.config.pause
    }
}

#[derive(Clone, Copy, Debug)]
enum Method {
    Get,
    Delete,
}

/// A [`Transport`] wrapped in the shared [`Throttle`].
///
/// Throttled (429) responses are retried without a cap; the caller only ever
/// sees the first non-429 response. Every other status is handed back as-is.
pub struct ThrottledClient<T> {
    transport: T,
    throttle: Arc<Throttle>,
}

impl<T: Transport> ThrottledClient<T> {
    pub fn new(transport: T, throttle: Arc<Throttle>) -> Self {
        Self {
            transport,
            throttle,
        }
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// GET through the throttle.
    pub async fn fetch(&self, url: &str) -> Result<GraphResponse> {
        self.send(Method::Get, url).await
    }

    /// DELETE through the throttle.
    pub async fn delete(&self, url: &str) -> Result<GraphResponse> {
        self.send(Method::Delete, url).await
    }

    async fn send(&self, method: Method, url: &str) -> Result<GraphResponse> {
        loop {
            let result = match method {
                Method::Get => self.transport.get(url).await,
                Method::Delete => self.transport.delete(url).await,
            };

            if self.throttle.record_call() {
                info!(calls = self.throttle.calls(), "pausing after API call threshold");
                tokio::time::sleep(self.throttle.pause()).await;
            }

            let response = result?;

            if !response.is_throttled() {
                return Ok(response);
            }

            let delay = self.throttle.retry_delay(&response);
            warn!(?method, url, wait_secs = delay.as_secs(), "throttled, waiting before retry");
            tokio::time::sleep(delay).await;
        }
    }
}
