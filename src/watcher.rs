use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{delivery::ReminderDeliveryChannel, storage::ReminderStorage};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_secs(2);

/// Periodically fires and removes due reminders.
pub struct ReminderWatcher {
    storage: Arc<dyn ReminderStorage>,
    delivery: Arc<dyn ReminderDeliveryChannel>,
    timezone: Tz,
    tick_interval: Duration,
    pacing_interval: Duration,
}

impl ReminderWatcher {
    pub fn new(
        storage: Arc<dyn ReminderStorage>,
        delivery: Arc<dyn ReminderDeliveryChannel>,
        timezone: Tz,
    ) -> Self {
        Self {
            storage,
            delivery,
            timezone,
            tick_interval: DEFAULT_TICK_INTERVAL,
            pacing_interval: DEFAULT_PACING_INTERVAL,
        }
    }

    pub fn with_intervals(mut self, tick_interval: Duration, pacing_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self.pacing_interval = pacing_interval;
        self
    }

    pub fn spawn(self, cancellation_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancellation_token).await })
    }

    /// Ticks until `cancellation_token` is cancelled. The first tick happens
    /// one interval after start.
    pub async fn run(self, cancellation_token: CancellationToken) {
        log::info!(
            "Watching reminders every {:?}, pacing {:?}",
            self.tick_interval,
            self.pacing_interval
        );
        let mut interval =
            tokio::time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    log::info!("Reminder watcher shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let now = Utc::now().with_timezone(&self.timezone);
                    self.tick(&now, &cancellation_token).await;
                }
            }
        }
    }

    /// Delivers and deletes every reminder due at `now`, pausing between them.
    /// Returns how many were removed.
    pub async fn tick(&self, now: &DateTime<Tz>, cancellation_token: &CancellationToken) -> usize {
        let mut due: Vec<_> = self
            .storage
            .data()
            .await
            .into_iter()
            .filter(|record| record.is_due(now))
            .collect();
        due.sort_by(|a, b| a.remind_at.cmp(&b.remind_at));

        let mut removed = 0;
        for record in due {
            if cancellation_token.is_cancelled() {
                break;
            }

            log::info!("[FIRE] Reminder {} due at {:?}", record.id, record.remind_at.time());
            if let Err(error) = self.delivery.send_reminder(&record).await {
                log::error!("Failed to deliver reminder {}: {error:#}", record.id);
            }

            match self.storage.delete(&record.id).await {
                Ok(()) => removed += 1,
                Err(error) => log::error!("Failed to delete reminder {}: {error}", record.id),
            }

            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = tokio::time::sleep(self.pacing_interval) => {}
            }
        }

        removed
    }
}
