//! Outbound request abstraction.
//!
//! The walker and planner never talk to reqwest directly; they go through a
//! [`Transport`] so the whole sweep can run against an in-memory fake.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;

use crate::auth::Authenticator;
use crate::error::Result;
use crate::models::ApiErrorResponse;

/// Status Graph returns when a caller is being throttled.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// A response reduced to what the sweep looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphResponse {
    pub status: u16,
    /// `Retry-After` in whole seconds, if the server sent a parseable one.
    pub retry_after: Option<u64>,
    pub body: String,
}

impl GraphResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn throttled(retry_after: Option<u64>) -> Self {
        Self {
            status: STATUS_TOO_MANY_REQUESTS,
            retry_after,
            body: String::new(),
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.status == STATUS_TOO_MANY_REQUESTS
    }

    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Best-effort error message for logs: the Graph error envelope if present, else the raw body.
    pub fn error_message(&self) -> String {
        match serde_json::from_str::<ApiErrorResponse>(&self.body) {
            Ok(api_error) => format!("{}: {}", api_error.error.code, api_error.error.message),
            Err(_) => self.body.chars().take(200).collect(),
        }
    }
}

/// The two calls a sweep makes against the remote tree.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<GraphResponse>;

    async fn delete(&self, url: &str) -> Result<GraphResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &str) -> Result<GraphResponse> {
        (**self).get(url).await
    }

    async fn delete(&self, url: &str) -> Result<GraphResponse> {
        (**self).delete(url).await
    }
}

/// Production transport: reqwest with a bearer token from an [`Authenticator`].
pub struct GraphTransport {
    auth: Authenticator,
    http: Client,
}

impl GraphTransport {
    pub fn new(auth: Authenticator) -> Self {
        Self {
            auth,
            http: Client::new(),
        }
    }

    async fn into_graph_response(response: reqwest::Response) -> Result<GraphResponse> {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body = response.text().await?;

        Ok(GraphResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[async_trait]
impl Transport for GraphTransport {
    async fn get(&self, url: &str) -> Result<GraphResponse> {
        let token = self.auth.get_access_token().await?;
        let response = self.http.get(url).bearer_auth(&token).send().await?;
        Self::into_graph_response(response).await
    }

    async fn delete(&self, url: &str) -> Result<GraphResponse> {
        let token = self.auth.get_access_token().await?;
        let response = self.http.delete(url).bearer_auth(&token).send().await?;
        Self::into_graph_response(response).await
    }
}
