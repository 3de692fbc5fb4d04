use std::time::Duration;

use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

// Per-tick traces are noisy; flip on when debugging cadence.
const ENABLE_LOGS: bool = false;

use crate::log_debug;

const TICK_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1-based count since the most recent `start()`.
    pub seq: u64,
}

/// Emits one [`Tick`] per period to every subscriber while running.
///
/// No catch-up: a stopped and restarted ticker starts a fresh cadence one
/// period after `start()`.
pub struct ClockTicker {
    period: Duration,
    sender: broadcast::Sender<Tick>,
    worker: Option<(JoinHandle<()>, CancellationToken)>,
}

impl ClockTicker {
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    pub fn with_period(period: Duration) -> Self {
        let (sender, _) = broadcast::channel(TICK_CHANNEL_CAPACITY);
        Self {
            period,
            sender,
            worker: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Tick> {
        self.sender.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts ticking; a no-op if already running. Must be called inside a
    /// tokio runtime.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let period = self.period;
        let sender = self.sender.clone();
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handle = tokio::spawn(async move {
            let mut seq: u64 = 0;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        seq = seq.wrapping_add(1);
                        log_debug!("tick {}", seq);
                        // No subscribers is fine; the tick is simply dropped.
                        let _ = sender.send(Tick { seq });
                    }
                }
            }
        });

        self.worker = Some((handle, cancel_token));
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some((handle, token)) = self.worker.take() {
            token.cancel();
            handle.abort();
        }
    }
}

impl Default for ClockTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
