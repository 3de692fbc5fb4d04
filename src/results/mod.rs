use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    api::{ApiClient, ApiError},
    models::{HookResult, LoadState},
};

/// Hook execution outcomes, newest first, with per-entry read state.
#[derive(Clone)]
pub struct ResultFeed {
    api: ApiClient,
    results: Arc<Mutex<LoadState<Vec<HookResult>>>>,
    scope: CancellationToken,
}

impl ResultFeed {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            results: Arc::new(Mutex::new(LoadState::Loading)),
            scope: CancellationToken::new(),
        }
    }

    /// Pulls the feed and orders it by `created_at`, most recent first.
    /// Entries with equal timestamps keep the service's order.
    pub async fn load(&self) -> Result<Vec<HookResult>, ApiError> {
        let fetched = self.api.fetch_hook_results().await.map(|mut results| {
            results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            results
        });
        if self.scope.is_cancelled() {
            return fetched;
        }

        let mut state = self.results.lock().await;
        match &fetched {
            Ok(results) => {
                info!("loaded {} hook results", results.len());
                *state = LoadState::Loaded(results.clone());
            }
            Err(err) => {
                warn!("failed to load hook results: {err}");
                *state = LoadState::Failed(err.to_string());
            }
        }
        fetched
    }

    pub async fn results(&self) -> LoadState<Vec<HookResult>> {
        self.results.lock().await.clone()
    }

    pub async fn unread_count(&self) -> usize {
        self.results
            .lock()
            .await
            .loaded()
            .map(|results| results.iter().filter(|result| !result.read).count())
            .unwrap_or(0)
    }

    /// Marks one entry read. Already-read entries succeed without another
    /// round trip; no other entry is touched.
    pub async fn mark_read(&self, result_id: &str) -> Result<(), ApiError> {
        let already_read = self
            .results
            .lock()
            .await
            .loaded()
            .and_then(|results| results.iter().find(|result| result.id == result_id))
            .map(|result| result.read)
            .unwrap_or(false);
        if already_read {
            return Ok(());
        }

        self.api.mark_hook_result_read(result_id).await?;
        if self.scope.is_cancelled() {
            return Ok(());
        }

        let mut state = self.results.lock().await;
        if let Some(result) = state
            .loaded_mut()
            .and_then(|results| results.iter_mut().find(|result| result.id == result_id))
        {
            result.read = true;
        }
        Ok(())
    }

    /// Detaches the feed from its view; later completions are discarded.
    pub fn teardown(&self) {
        self.scope.cancel();
    }
}
