use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    api::ApiClient,
    history::HistoryView,
    hooks::HookRegistry,
    models::{HookDefinition, HookResult, LoadState},
    results::ResultFeed,
    settings::ConsoleSettings,
    timer::{SessionEvent, SessionHandle},
    utils::{format_countdown, format_history_duration},
};

/// Scheduling summary of one hook at a given moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOverview {
    pub hook_id: String,
    pub name: String,
    pub configured: bool,
    pub enabled: bool,
    pub due: bool,
    pub last_fired: Option<NaiveDateTime>,
    pub next_eligible: Option<NaiveDateTime>,
}

/// Builds the overview for every hook, taking each hook's newest result as
/// its last run. Times are local wall-clock.
pub fn hook_overview(
    hooks: &[HookDefinition],
    results: &[HookResult],
    now: NaiveDateTime,
) -> Vec<HookOverview> {
    hooks
        .iter()
        .map(|hook| {
            let last_fired = results
                .iter()
                .filter(|result| result.hook_id == hook.id)
                .map(|result| result.created_at.with_timezone(&Local).naive_local())
                .max();
            let window = hook.schedule.window();
            HookOverview {
                hook_id: hook.id.clone(),
                name: hook.name.clone(),
                configured: window.is_some(),
                enabled: window.is_some_and(|w| w.enabled),
                due: window.is_some_and(|w| w.is_due(now, last_fired)),
                last_fired,
                next_eligible: window.and_then(|w| w.next_eligible(now, last_fired)),
            }
        })
        .collect()
}

/// One operator's console: the live session view plus the hook, result
/// and history panels, all against the same service.
pub struct Console {
    api: ApiClient,
    session: SessionHandle,
    hooks: HookRegistry,
    results: ResultFeed,
    history: HistoryView,
}

impl Console {
    /// Connects the push channel and prepares the panels. Must be called
    /// inside a tokio runtime.
    pub fn open(settings: &ConsoleSettings) -> Result<Self> {
        let api = ApiClient::new(settings.server_url()?).context("failed to build api client")?;
        let push_url = api.push_url().context("failed to derive push url")?;
        info!("opening console against {}", api.base_url());

        Ok(Self {
            session: SessionHandle::open(push_url, settings.tick_interval()),
            hooks: HookRegistry::new(api.clone()),
            results: ResultFeed::new(api.clone()),
            history: HistoryView::new(api.clone(), settings.history_days),
            api,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn results(&self) -> &ResultFeed {
        &self.results
    }

    pub fn history(&self) -> &HistoryView {
        &self.history
    }

    /// Seeds the session mirror from `GET /focusing` so the panel isn't
    /// blank while the push channel connects.
    pub async fn seed_session(&self) {
        match self.api.fetch_focusing().await {
            Ok(state) => {
                if self
                    .session
                    .events()
                    .send(SessionEvent::Authoritative(state))
                    .await
                    .is_err()
                {
                    warn!("session view closed before seeding");
                }
            }
            Err(err) => warn!("could not pull focus state: {err}"),
        }
    }

    /// Reloads every panel concurrently. Returns the health probe result.
    pub async fn refresh(&self) -> bool {
        let (healthy, _, _, _) = tokio::join!(
            self.api.fetch_health(),
            self.hooks.load(),
            self.results.load(),
            self.history.load(),
        );
        if !healthy {
            warn!("service at {} is unhealthy", self.api.base_url());
        }
        healthy
    }

    /// [`Console::refresh`] that gives up as soon as `shutdown` fires.
    /// `None` means it was interrupted; panels keep whatever the abandoned
    /// loads had not yet written.
    pub async fn refresh_until(&self, shutdown: &CancellationToken) -> Option<bool> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            healthy = self.refresh() => Some(healthy),
        }
    }

    /// Logs a one-shot summary of every panel.
    pub async fn report(&self) {
        if let Some(snapshot) = self.session.current() {
            info!(
                "focus: {:?}, {} left, {} since last change, {} sessions today",
                snapshot.phase,
                format_countdown(snapshot.state.remaining_seconds as i64),
                format_countdown(snapshot.state.since_last_change_seconds as i64),
                snapshot.state.sessions_today
            );
        } else {
            info!("focus: connecting...");
        }

        let results = self.results.results().await;
        match self.hooks.hooks().await {
            LoadState::Loaded(hooks) if hooks.is_empty() => info!("no hooks registered"),
            LoadState::Loaded(hooks) => {
                let known_results = results.loaded().map(Vec::as_slice).unwrap_or(&[]);
                let now = Local::now().naive_local();
                for overview in hook_overview(&hooks, known_results, now) {
                    let next = overview
                        .next_eligible
                        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    info!(
                        "hook {} ({}): enabled={} due={} next={}",
                        overview.name, overview.hook_id, overview.enabled, overview.due, next
                    );
                }
            }
            LoadState::Failed(_) => warn!("failed to load hooks"),
            LoadState::Loading => info!("hooks loading..."),
        }
        if let Some(err) = self.hooks.last_error().await {
            warn!("hook list may be stale: {err}");
        }

        match results {
            LoadState::Loaded(_) => {
                info!("{} unread hook results", self.results.unread_count().await)
            }
            LoadState::Failed(_) => warn!("failed to load hook results"),
            LoadState::Loading => {}
        }

        match self.history.records().await {
            LoadState::Loaded(records) if records.is_empty() => {
                info!("no sessions in the last {} days", self.history.days())
            }
            LoadState::Loaded(records) => {
                let total: u64 = records.iter().map(|record| record.duration).sum();
                info!(
                    "{} sessions in the last {} days ({} focused)",
                    records.len(),
                    self.history.days(),
                    format_history_duration(total)
                );
            }
            LoadState::Failed(_) => warn!("failed to load history"),
            LoadState::Loading => {}
        }
    }

    /// Tears down every panel: the push channel and ticker stop, and
    /// in-flight requests can no longer write back.
    pub async fn close(self) {
        self.hooks.teardown();
        self.results.teardown();
        self.history.teardown();
        self.session.close().await;
    }
}
