mod model;
mod reminder_storage;

pub(crate) use model::format_timestamp;
pub use reminder_storage::{FileReminderStorage, ReminderStorage, StorageError};
