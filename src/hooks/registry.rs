use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::{info, warn};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    api::{ApiClient, ApiError},
    models::{HookDefinition, HookSchedule, LoadState},
    schedule::{ScheduleViolation, ScheduleWindow},
};

use super::{ActionStatus, ContextPreview, HookAction, HookCard};

#[derive(Debug, Error)]
pub enum HookActionError {
    #[error("unknown hook '{0}'")]
    UnknownHook(String),
    #[error("a {action} is already in progress for hook '{hook_id}'")]
    AlreadyPending { hook_id: String, action: HookAction },
    #[error(transparent)]
    Invalid(#[from] ScheduleViolation),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("hook view was closed")]
    TornDown,
}

#[derive(Default)]
struct RegistryInner {
    hooks: LoadState<Vec<HookDefinition>>,
    cards: HashMap<String, HookCard>,
    pending: HashSet<(String, HookAction)>,
    /// Failure of the latest refresh while an older set stays cached.
    last_error: Option<String>,
}

impl RegistryInner {
    fn hook(&self, hook_id: &str) -> Option<&HookDefinition> {
        self.hooks
            .loaded()
            .and_then(|hooks| hooks.iter().find(|hook| hook.id == hook_id))
    }

    fn hook_mut(&mut self, hook_id: &str) -> Option<&mut HookDefinition> {
        self.hooks
            .loaded_mut()
            .and_then(|hooks| hooks.iter_mut().find(|hook| hook.id == hook_id))
    }

    fn set_status(&mut self, hook_id: &str, status: ActionStatus) {
        if let Some(card) = self.cards.get_mut(hook_id) {
            card.status = status;
        }
    }

    /// Marks `action` in flight for `hook_id`, refusing a second one.
    fn begin(&mut self, hook_id: &str, action: HookAction) -> Result<(), HookActionError> {
        if self.hook(hook_id).is_none() {
            return Err(HookActionError::UnknownHook(hook_id.to_string()));
        }
        if !self.pending.insert((hook_id.to_string(), action)) {
            return Err(HookActionError::AlreadyPending {
                hook_id: hook_id.to_string(),
                action,
            });
        }
        Ok(())
    }

    fn finish(&mut self, hook_id: &str, action: HookAction) {
        self.pending.remove(&(hook_id.to_string(), action));
    }
}

/// Cached hook definitions plus the per-hook card state of the console.
///
/// Cheap to clone; clones share the cache. After [`HookRegistry::teardown`]
/// remote calls still complete but their results are not written back.
#[derive(Clone)]
pub struct HookRegistry {
    api: ApiClient,
    inner: Arc<Mutex<RegistryInner>>,
    scope: CancellationToken,
}

impl HookRegistry {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            inner: Arc::new(Mutex::new(RegistryInner::default())),
            scope: CancellationToken::new(),
        }
    }

    /// Replaces the cached set with a fresh pull. Every configured schedule
    /// is normalized against its hook's schema before it is cached.
    ///
    /// A failed pull only marks the registry as failed when nothing was
    /// loaded before; otherwise the cached set and its cards stay usable
    /// and the failure is kept in [`HookRegistry::last_error`].
    pub async fn load(&self) -> Result<Vec<HookDefinition>, ApiError> {
        let fetched = self.api.fetch_hooks().await;
        if self.scope.is_cancelled() {
            return fetched;
        }

        let mut inner = self.inner.lock().await;
        match fetched {
            Ok(hooks) => {
                let hooks: Vec<HookDefinition> = hooks.into_iter().map(normalize_hook).collect();
                let mut cards = HashMap::with_capacity(hooks.len());
                for hook in &hooks {
                    let card = match inner.cards.get(&hook.id) {
                        Some(existing) => existing.refreshed(hook),
                        None => HookCard::from_definition(hook),
                    };
                    cards.insert(hook.id.clone(), card);
                }
                inner.cards = cards;
                inner.hooks = LoadState::Loaded(hooks.clone());
                inner.last_error = None;
                info!("loaded {} hooks", hooks.len());
                Ok(hooks)
            }
            Err(err) => {
                match inner.hooks.loaded().map(Vec::len) {
                    Some(cached) => {
                        warn!("failed to refresh hooks, keeping {cached} cached: {err}");
                        inner.last_error = Some(err.to_string());
                    }
                    None => {
                        warn!("failed to load hooks: {err}");
                        inner.hooks = LoadState::Failed(err.to_string());
                    }
                }
                Err(err)
            }
        }
    }

    pub async fn hooks(&self) -> LoadState<Vec<HookDefinition>> {
        self.inner.lock().await.hooks.clone()
    }

    /// Why the latest refresh failed, if the cached set is now stale.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    pub async fn hook(&self, hook_id: &str) -> Option<HookDefinition> {
        self.inner.lock().await.hook(hook_id).cloned()
    }

    pub async fn card(&self, hook_id: &str) -> Option<HookCard> {
        self.inner.lock().await.cards.get(hook_id).cloned()
    }

    pub async fn is_pending(&self, hook_id: &str, action: HookAction) -> bool {
        self.inner
            .lock()
            .await
            .pending
            .contains(&(hook_id.to_string(), action))
    }

    /// Applies a local edit to the hook's draft and marks it dirty.
    pub async fn edit_card(
        &self,
        hook_id: &str,
        change: impl FnOnce(&mut ScheduleWindow),
    ) -> Result<(), HookActionError> {
        let mut inner = self.inner.lock().await;
        let card = inner
            .cards
            .get_mut(hook_id)
            .ok_or_else(|| HookActionError::UnknownHook(hook_id.to_string()))?;
        card.edit(change);
        Ok(())
    }

    /// Submits the card's draft through [`HookRegistry::save_schedule`].
    pub async fn save_card(&self, hook_id: &str) -> Result<(), HookActionError> {
        let draft = self
            .card(hook_id)
            .await
            .map(|card| card.draft)
            .ok_or_else(|| HookActionError::UnknownHook(hook_id.to_string()))?;
        self.save_schedule(hook_id, draft).await
    }

    /// Validates `window` against the hook's schema and submits it.
    ///
    /// A violation never reaches the service and leaves the cache as it
    /// was. On success the cached schedule is swapped in one step and the
    /// set is reloaded.
    pub async fn save_schedule(
        &self,
        hook_id: &str,
        window: ScheduleWindow,
    ) -> Result<(), HookActionError> {
        let window = {
            let mut inner = self.inner.lock().await;
            let schema = inner
                .hook(hook_id)
                .map(|hook| hook.parameter_schema.clone())
                .ok_or_else(|| HookActionError::UnknownHook(hook_id.to_string()))?;

            if let Err(violation) = window.validate(&schema) {
                inner.set_status(hook_id, ActionStatus::Failed(violation.to_string()));
                return Err(violation.into());
            }

            inner.begin(hook_id, HookAction::Save)?;
            inner.set_status(hook_id, ActionStatus::Pending(HookAction::Save));
            window.normalize(&schema)
        };

        let result = self.api.update_hook_config(hook_id, &window).await;

        {
            let mut inner = self.inner.lock().await;
            inner.finish(hook_id, HookAction::Save);
            if self.scope.is_cancelled() {
                return Err(HookActionError::TornDown);
            }

            if let Err(err) = result {
                warn!("saving schedule for hook {hook_id} failed: {err}");
                inner.set_status(hook_id, ActionStatus::Failed(err.to_string()));
                return Err(err.into());
            }

            if let Some(hook) = inner.hook_mut(hook_id) {
                hook.schedule = HookSchedule::Configured(window.clone());
            }
            if let Some(card) = inner.cards.get_mut(hook_id) {
                card.draft = window;
                card.dirty = false;
                card.status = ActionStatus::Succeeded("Saved".to_string());
            }
        }

        if let Err(err) = self.load().await {
            warn!("refresh after saving hook {hook_id} failed: {err}");
        }
        Ok(())
    }

    /// Asks the service to run the hook now, regardless of its schedule.
    /// The outcome shows up later in the result feed.
    pub async fn trigger(&self, hook_id: &str) -> Result<(), HookActionError> {
        {
            let mut inner = self.inner.lock().await;
            inner.begin(hook_id, HookAction::Trigger)?;
            inner.set_status(hook_id, ActionStatus::Pending(HookAction::Trigger));
        }

        let result = self.api.trigger_hook(hook_id).await;

        let mut inner = self.inner.lock().await;
        inner.finish(hook_id, HookAction::Trigger);
        if self.scope.is_cancelled() {
            return Err(HookActionError::TornDown);
        }

        match result {
            Ok(()) => {
                inner.set_status(hook_id, ActionStatus::Succeeded("Triggered".to_string()));
                Ok(())
            }
            Err(err) => {
                warn!("triggering hook {hook_id} failed: {err}");
                inner.set_status(hook_id, ActionStatus::Failed(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Fetches the context the hook would run with and shows it on the card.
    pub async fn context(&self, hook_id: &str) -> Result<String, HookActionError> {
        {
            let mut inner = self.inner.lock().await;
            inner.begin(hook_id, HookAction::Context)?;
            if let Some(card) = inner.cards.get_mut(hook_id) {
                card.context = ContextPreview::Loading;
            }
        }

        let result = self.api.fetch_hook_context(hook_id).await;

        let mut inner = self.inner.lock().await;
        inner.finish(hook_id, HookAction::Context);
        if self.scope.is_cancelled() {
            return Err(HookActionError::TornDown);
        }

        match result {
            Ok(text) => {
                if let Some(card) = inner.cards.get_mut(hook_id) {
                    card.context = ContextPreview::Shown(text.clone());
                }
                Ok(text)
            }
            Err(err) => {
                if let Some(card) = inner.cards.get_mut(hook_id) {
                    card.context = ContextPreview::Hidden;
                    card.status = ActionStatus::Failed(err.to_string());
                }
                Err(err.into())
            }
        }
    }

    pub async fn hide_context(&self, hook_id: &str) {
        if let Some(card) = self.inner.lock().await.cards.get_mut(hook_id) {
            card.context = ContextPreview::Hidden;
        }
    }

    /// Detaches the registry from its view. Completions after this point
    /// are discarded.
    pub fn teardown(&self) {
        self.scope.cancel();
    }
}

fn normalize_hook(mut hook: HookDefinition) -> HookDefinition {
    hook.schedule = match std::mem::take(&mut hook.schedule) {
        HookSchedule::Configured(window) => {
            HookSchedule::Configured(window.normalize(&hook.parameter_schema))
        }
        HookSchedule::Unconfigured => HookSchedule::Unconfigured,
    };
    hook
}
