use std::sync::Arc;

use log::warn;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    api::{ApiClient, ApiError},
    models::{FocusRecord, LoadState},
};

pub const DEFAULT_HISTORY_DAYS: u32 = 7;

/// Recent focus sessions over the last `days` days.
#[derive(Clone)]
pub struct HistoryView {
    api: ApiClient,
    days: u32,
    records: Arc<Mutex<LoadState<Vec<FocusRecord>>>>,
    scope: CancellationToken,
}

impl HistoryView {
    pub fn new(api: ApiClient, days: u32) -> Self {
        Self {
            api,
            days,
            records: Arc::new(Mutex::new(LoadState::Loading)),
            scope: CancellationToken::new(),
        }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub async fn load(&self) -> Result<Vec<FocusRecord>, ApiError> {
        let fetched = self.api.fetch_history(self.days).await;
        if self.scope.is_cancelled() {
            return fetched;
        }

        *self.records.lock().await = match &fetched {
            Ok(records) => LoadState::Loaded(records.clone()),
            Err(err) => {
                warn!("failed to load history: {err}");
                LoadState::Failed(err.to_string())
            }
        };
        fetched
    }

    pub async fn records(&self) -> LoadState<Vec<FocusRecord>> {
        self.records.lock().await.clone()
    }

    pub fn teardown(&self) {
        self.scope.cancel();
    }
}
