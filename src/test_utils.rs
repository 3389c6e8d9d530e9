use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::{
    delivery::ReminderDeliveryChannel,
    reminder::{Record, ReminderId, ReminderTime},
    storage::{ReminderStorage, StorageError},
};

/// Store without a backing file. `fail_writes` makes every save and delete
/// fail the way a full disk would.
#[derive(Default)]
pub struct InMemoryReminderStorage {
    store: tokio::sync::Mutex<HashMap<ReminderId, Record>>,
    fail_writes: AtomicBool,
}

impl InMemoryReminderStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            store: tokio::sync::Mutex::new(store),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::Relaxed);
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

#[async_trait]
impl ReminderStorage for InMemoryReminderStorage {
    async fn load(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn data(&self) -> Vec<Record> {
        self.store.lock().await.values().cloned().collect()
    }

    async fn save(&self, record: Record) -> Result<(), StorageError> {
        self.check_writable()?;
        self.store.lock().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.store.lock().await.remove(id);
        Ok(())
    }
}

/// A delivered reminder and whether it was still stored at delivery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub id: ReminderId,
    pub was_stored: bool,
}

type DeliveredReminders = Arc<Mutex<Vec<Delivered>>>;

#[derive(Clone)]
pub struct TestDeliveryChannel {
    storage: Arc<InMemoryReminderStorage>,
    delivered: DeliveredReminders,
    fail: bool,
}

impl TestDeliveryChannel {
    pub fn new(storage: Arc<InMemoryReminderStorage>) -> Self {
        Self {
            storage,
            delivered: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing(storage: Arc<InMemoryReminderStorage>) -> Self {
        Self {
            fail: true,
            ..Self::new(storage)
        }
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReminderDeliveryChannel for TestDeliveryChannel {
    async fn send_reminder(&self, record: &Record) -> anyhow::Result<()> {
        let was_stored = self
            .storage
            .data()
            .await
            .iter()
            .any(|stored| stored.id == record.id);
        self.delivered.lock().unwrap().push(Delivered {
            id: record.id.clone(),
            was_stored,
        });

        if self.fail {
            anyhow::bail!("chat is unreachable");
        }
        Ok(())
    }
}

pub fn record_at(id: &str, remind_at: DateTime<Tz>) -> Record {
    Record {
        id: id.to_owned(),
        user_id: "U1".to_owned(),
        channel: "C1".to_owned(),
        content: format!("reminder {id}"),
        created_at: ReminderTime::new(remind_at - Duration::hours(1)),
        remind_at: ReminderTime::new(remind_at),
    }
}
