use async_trait::async_trait;
use ledger_core::events::{EventCreatePayload, EventItem};
use ledger_core::query::EventQuery;
use ledger_core::reference::{Agent, InventoryItem, ResourceKind, Tag, Tool};
use reqwest::Method;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Exit codes: 1=client error (4xx), 2=server error (5xx) or bad body,
    /// 3=connection error, 4=usage error
    pub fn exit_code(&self) -> i32 {
        match self {
            ApiError::InvalidUrl { .. } => 4,
            ApiError::Transport(_) => 3,
            ApiError::Status { status, .. } if (400..500).contains(status) => 1,
            ApiError::Status { .. } | ApiError::Decode(_) => 2,
        }
    }
}

/// The REST endpoints the events view talks to.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<EventItem>, ApiError>;
    async fn get_event(&self, id: i64) -> Result<EventItem, ApiError>;
    async fn create_event(&self, payload: &EventCreatePayload) -> Result<EventItem, ApiError>;
    async fn delete_event(&self, id: i64) -> Result<(), ApiError>;
    async fn list_agents(&self) -> Result<Vec<Agent>, ApiError>;
    async fn list_tools(&self) -> Result<Vec<Tool>, ApiError>;
    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError>;
}

/// [`LedgerApi`] over HTTP with an optional bearer token.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: crate::util::client(),
        }
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let raw = format!("{}{path}", self.base_url);
        reqwest::Url::parse(&raw).map_err(|source| ApiError::InvalidUrl { url: raw, source })
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let mut req = self.client.request(method, self.url(path)?);
        if let Some(t) = &self.token {
            req = req.bearer_auth(t);
        }
        Ok(req)
    }

    /// Build (without sending) the list request for `query`.
    pub fn events_request(&self, query: &EventQuery) -> Result<reqwest::Request, ApiError> {
        Ok(self
            .request(Method::GET, "/api/events")?
            .query(&query.to_pairs())
            .build()?)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        check(req.send().await?).await
    }

    async fn fetch<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let resp = self.send(req).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn list_inventory(&self, kind: ResourceKind) -> Result<Vec<InventoryItem>, ApiError> {
        let rows: Vec<serde_json::Value> = self.fetch(self.request(Method::GET, &kind.path())?).await?;
        rows.into_iter()
            .map(|row| InventoryItem::from_value(kind, row).map_err(ApiError::from))
            .collect()
    }

    pub async fn create_inventory(
        &self,
        kind: ResourceKind,
        body: &serde_json::Value,
    ) -> Result<InventoryItem, ApiError> {
        let row: serde_json::Value = self
            .fetch(self.request(Method::POST, &kind.path())?.json(body))
            .await?;
        Ok(InventoryItem::from_value(kind, row)?)
    }

    pub async fn delete_inventory(&self, kind: ResourceKind, id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{id}", kind.path());
        self.send(self.request(Method::DELETE, &path)?).await?;
        Ok(())
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        detail: error_detail(&body, status),
    })
}

/// The backend reports failures as `{"detail": ...}`; fall back to the raw
/// body or the status reason.
fn error_detail(body: &str, status: reqwest::StatusCode) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => serde_json::Value::Object(map).to_string(),
        },
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

#[async_trait]
impl LedgerApi for HttpApi {
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<EventItem>, ApiError> {
        let req = self.events_request(query)?;
        tracing::debug!(url = %req.url(), "listing events");
        let resp = check(self.client.execute(req).await?).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_event(&self, id: i64) -> Result<EventItem, ApiError> {
        self.fetch(self.request(Method::GET, &format!("/api/events/{id}"))?).await
    }

    async fn create_event(&self, payload: &EventCreatePayload) -> Result<EventItem, ApiError> {
        self.fetch(self.request(Method::POST, "/api/events")?.json(payload)).await
    }

    async fn delete_event(&self, id: i64) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, &format!("/api/events/{id}"))?).await?;
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        self.fetch(self.request(Method::GET, "/api/agents")?).await
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, ApiError> {
        self.fetch(self.request(Method::GET, "/api/tools")?).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.fetch(self.request(Method::GET, "/api/tags")?).await
    }
}
