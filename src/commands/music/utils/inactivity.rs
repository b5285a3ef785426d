//! Per-guild inactivity watchdog.
//!
//! Arming spawns a ticker that posts an `IdleCheck` into the guild's mailbox
//! every poll interval until the idle timeout has elapsed. The ticker never
//! looks at session state itself: the session re-validates on every tick and
//! only the tick flagged `expired` may disconnect. Each arm gets a new
//! generation, so ticks from a superseded or cancelled arm are ignored even if
//! they were already queued.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::session_actor::SessionCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for IdleSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct InactivityWatchdog {
    settings: IdleSettings,
    generation: u64,
    ticker: Option<JoinHandle<()>>,
}

impl InactivityWatchdog {
    pub fn new(settings: IdleSettings) -> Self {
        Self {
            settings,
            generation: 0,
            ticker: None,
        }
    }

    pub fn settings(&self) -> IdleSettings {
        self.settings
    }

    pub fn is_armed(&self) -> bool {
        self.ticker.is_some()
    }

    /// Whether a tick with `generation` belongs to the live arm.
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_armed() && generation == self.generation
    }

    /// Starts a fresh countdown, superseding any previous one.
    pub(crate) fn arm(&mut self, mailbox: mpsc::UnboundedSender<SessionCommand>) -> u64 {
        self.disarm();
        self.generation += 1;

        let generation = self.generation;
        let settings = self.settings;
        self.ticker = Some(tokio::spawn(tick(generation, settings, mailbox)));
        generation
    }

    /// Cancels the pending countdown. Returns whether one was running.
    pub fn disarm(&mut self) -> bool {
        match self.ticker.take() {
            Some(ticker) => {
                ticker.abort();
                debug!("Inactivity watchdog generation {} cancelled", self.generation);
                true
            }
            None => false,
        }
    }
}

impl Drop for InactivityWatchdog {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

async fn tick(generation: u64, settings: IdleSettings, mailbox: mpsc::UnboundedSender<SessionCommand>) {
    let start = Instant::now();
    let deadline = start + settings.timeout;
    let mut interval = tokio::time::interval_at(start + settings.poll_interval, settings.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let now = interval.tick().await;
        let expired = now >= deadline;

        if mailbox
            .send(SessionCommand::IdleCheck { generation, expired })
            .is_err()
            || expired
        {
            break;
        }
    }
}
