use std::time::Duration;

use log::{info, warn};
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{api::push, models::SessionState};

use super::{ClockTicker, SessionMirror, SessionSnapshot, Tick};

const EVENT_QUEUE_CAPACITY: usize = 64;

/// Everything that can change the mirrored session. Pushes and ticks share
/// one queue so they are applied strictly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Authoritative(SessionState),
    Tick,
}

/// Scoped ownership of a live session view: the push channel, the ticker
/// and the reconcile loop that applies their events.
///
/// [`SessionHandle::close`] (or dropping the handle) tears all of it down;
/// no event is applied afterwards.
pub struct SessionHandle {
    snapshots: watch::Receiver<Option<SessionSnapshot>>,
    events: mpsc::Sender<SessionEvent>,
    cancel_token: CancellationToken,
    ticker: ClockTicker,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionHandle {
    /// Connects to the push channel at `push_url` and starts ticking.
    pub fn open(push_url: Url, tick_period: Duration) -> Self {
        let mut handle = Self::offline(tick_period);
        let push_task = tokio::spawn(push::run_push_channel(
            push_url,
            handle.events.clone(),
            handle.cancel_token.clone(),
        ));
        handle.tasks.push(push_task);
        handle
    }

    /// A handle with a running ticker but no push channel. Updates arrive
    /// only through [`SessionHandle::events`].
    pub fn offline(tick_period: Duration) -> Self {
        let cancel_token = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(None);

        let mut ticker = ClockTicker::with_period(tick_period);
        let ticks = ticker.subscribe();
        ticker.start();

        let forward_task = tokio::spawn(forward_ticks(
            ticks,
            events_tx.clone(),
            cancel_token.clone(),
        ));
        let reconcile_task = tokio::spawn(reconcile_loop(
            events_rx,
            snapshot_tx,
            cancel_token.clone(),
        ));

        Self {
            snapshots: snapshot_rx,
            events: events_tx,
            cancel_token,
            ticker,
            tasks: vec![forward_task, reconcile_task],
        }
    }

    /// Latest reconciled snapshot; `None` before the first authoritative update.
    pub fn current(&self) -> Option<SessionSnapshot> {
        *self.snapshots.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionSnapshot>> {
        self.snapshots.clone()
    }

    /// Sender into the reconcile queue, e.g. to seed the mirror from a
    /// pulled snapshot.
    pub fn events(&self) -> mpsc::Sender<SessionEvent> {
        self.events.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Closes the push channel, stops the ticker and waits for every task
    /// to finish.
    pub async fn close(mut self) {
        self.teardown();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!("session task ended abnormally: {err}");
                }
            }
        }
        info!("session view closed");
    }

    fn teardown(&mut self) {
        self.cancel_token.cancel();
        self.ticker.stop();
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.teardown();
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn forward_ticks(
    mut ticks: broadcast::Receiver<Tick>,
    events: mpsc::Sender<SessionEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            tick = ticks.recv() => match tick {
                Ok(_) => {
                    if events.send(SessionEvent::Tick).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Missed ticks are not replayed.
                    warn!("session view lagged behind ticker by {missed} ticks");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Applies queued events to a [`SessionMirror`] in arrival order and
/// publishes each resulting snapshot.
pub(crate) async fn reconcile_loop(
    mut events: mpsc::Receiver<SessionEvent>,
    snapshots: watch::Sender<Option<SessionSnapshot>>,
    cancel_token: CancellationToken,
) {
    let mut mirror = SessionMirror::new();

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if cancel_token.is_cancelled() {
            break;
        }

        let snapshot = match event {
            SessionEvent::Authoritative(state) => {
                let before = mirror.phase();
                let snapshot = mirror.on_authoritative_update(state);
                if before != snapshot.phase {
                    info!(
                        "session phase {:?} -> {:?} ({}s left, {} today)",
                        before,
                        snapshot.phase,
                        state.remaining_seconds,
                        state.sessions_today
                    );
                }
                Some(snapshot)
            }
            SessionEvent::Tick => mirror.on_tick(),
        };

        if let Some(snapshot) = snapshot {
            snapshots.send_replace(Some(snapshot));
        }
    }
}
