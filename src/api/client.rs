use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{
    models::{FocusRecord, HookDefinition, HookResult, SessionState},
    schedule::ScheduleWindow,
};

use super::{push::FocusInfo, ApiError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Body of `PUT /hooks/{id}`.
#[derive(Serialize)]
struct ScheduleUpdate<'a> {
    #[serde(flatten)]
    window: &'a ScheduleWindow,
    trigger: &'static str,
}

/// Request/response client for the focus service.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// WebSocket URL of the push channel (`/connect`, `ws`/`wss` scheme).
    pub fn push_url(&self) -> Result<Url, ApiError> {
        let mut url = self.endpoint(&["connect"])?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ApiError::InvalidUrl(format!("unsupported scheme '{other}'"))),
        };
        url.set_scheme(scheme)
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
        Ok(url)
    }

    /// Never fails: any transport error or non-success status is "unhealthy".
    pub async fn fetch_health(&self) -> bool {
        let Ok(url) = self.endpoint(&["health"]) else {
            return false;
        };
        match self.http.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("health probe failed: {err}");
                false
            }
        }
    }

    pub async fn fetch_history(&self, days: u32) -> Result<Vec<FocusRecord>, ApiError> {
        let mut url = self.endpoint(&["history"])?;
        url.query_pairs_mut().append_pair("days", &days.to_string());
        self.get_list(url).await
    }

    /// One-off pull of the same payload the push channel sends.
    pub async fn fetch_focusing(&self) -> Result<SessionState, ApiError> {
        let info: FocusInfo = self.get_json(self.endpoint(&["focusing"])?).await?;
        Ok(info.into())
    }

    pub async fn fetch_hooks(&self) -> Result<Vec<HookDefinition>, ApiError> {
        self.get_list(self.endpoint(&["hooks"])?).await
    }

    pub async fn update_hook_config(
        &self,
        hook_id: &str,
        window: &ScheduleWindow,
    ) -> Result<(), ApiError> {
        let body = ScheduleUpdate {
            window,
            trigger: "scheduled",
        };
        let url = self.endpoint(&["hooks", hook_id])?;
        self.send(self.http.put(url).json(&body)).await?;
        info!("saved schedule for hook {hook_id}");
        Ok(())
    }

    pub async fn trigger_hook(&self, hook_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["hooks", hook_id, "trigger"])?;
        self.send(self.http.post(url)).await?;
        info!("triggered hook {hook_id}");
        Ok(())
    }

    pub async fn fetch_hook_context(&self, hook_id: &str) -> Result<String, ApiError> {
        #[derive(serde::Deserialize)]
        struct ContextBody {
            context: String,
        }

        let body: ContextBody = self
            .get_json(self.endpoint(&["hooks", hook_id, "context"])?)
            .await?;
        Ok(body.context)
    }

    pub async fn fetch_hook_results(&self) -> Result<Vec<HookResult>, ApiError> {
        self.get_list(self.endpoint(&["hook-results"])?).await
    }

    pub async fn mark_hook_result_read(&self, result_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["hook-results", result_id, "read"])?;
        self.send(self.http.post(url)).await?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends the request and returns the body of a 2xx response. Any other
    /// status becomes [`ApiError::Rejection`] carrying the body text.
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = match body.trim() {
            "" => status
                .canonical_reason()
                .unwrap_or("request rejected")
                .to_string(),
            text => text.to_string(),
        };
        warn!("service rejected request with {status}: {message}");
        Err(ApiError::Rejection {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let body = self.send(self.http.get(url)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Lists may come back as `null` when empty.
    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, ApiError> {
        let items: Option<Vec<T>> = self.get_json(url).await?;
        Ok(items.unwrap_or_default())
    }
}
