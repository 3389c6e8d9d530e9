use async_trait::async_trait;

use crate::reminder::Record;

/// Hands a due reminder back to its user. Called by the watcher right before
/// the record is deleted.
#[async_trait]
pub trait ReminderDeliveryChannel: Send + Sync + 'static {
    async fn send_reminder(&self, record: &Record) -> anyhow::Result<()>;
}
