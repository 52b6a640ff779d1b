use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{clock, db::{Participant, Store}, Config};

/// Periodically evicts participants that stopped sending keep-alives and
/// announces their departure.
pub struct Sweeper {
    store: Store,
    interval: Duration,
    inactivity_timeout: Duration,
}

impl Sweeper {
    pub fn new(store: Store, config: &Config) -> Sweeper {
        Sweeper {
            store,
            interval: config.sweep_interval,
            inactivity_timeout: config.inactivity_timeout,
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Sweeps every interval until `shutdown` is cancelled. The first sweep
    /// happens one interval after start.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            match self.sweep(clock::now_millis()).await {
                Ok(evicted) => tracing::debug!(evicted = evicted.len(), "sweep done"),
                Err(err) => tracing::warn!("sweep failed: {err:#}"),
            }
        }

        tracing::info!("sweeper stopped");
    }

    /// One pass at time `now` (ms since the epoch). Returns who was evicted.
    pub async fn sweep(&self, now: i64) -> anyhow::Result<Vec<String>> {
        let timeout = i64::try_from(self.inactivity_timeout.as_millis())?;

        let mut evicted = Vec::new();
        for participant in self.store.participants().await? {
            if !is_stale(&participant, now, timeout) {
                continue;
            }

            // a keep-alive since the read makes this a no-op
            if self.store.evict(&participant, clock::wall_clock()?).await? {
                tracing::info!(name = %participant.name, "participant left after inactivity");
                evicted.push(participant.name);
            }
        }

        Ok(evicted)
    }
}

fn is_stale(participant: &Participant, now: i64, timeout: i64) -> bool {
    now - participant.last_status > timeout
}
