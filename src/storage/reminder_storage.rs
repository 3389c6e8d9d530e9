use std::{
    collections::HashMap,
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono_tz::Tz;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

use crate::reminder::{Record, ReminderId};

use super::model;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("open file {} failed", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("malformed row at line {line}: expected 6 fields, found {found}")]
    MalformedRow { line: u64, found: usize },

    #[error("invalid timestamp {value:?} at line {line}")]
    InvalidTimestamp { line: u64, value: String },
}

impl StorageError {
    /// The store file does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::Open { source, .. } if source.kind() == io::ErrorKind::NotFound
        )
    }
}

#[async_trait]
pub trait ReminderStorage: Send + Sync {
    /// Replaces the cache with the persisted records. On failure the cache is
    /// left empty.
    async fn load(&self) -> Result<(), StorageError>;

    /// Snapshot of every cached record, in no particular order.
    async fn data(&self) -> Vec<Record>;

    /// Inserts or replaces the record with the same id and persists the cache.
    async fn save(&self, record: Record) -> Result<(), StorageError>;

    /// Removes the record if present and persists the cache.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}

/// Records kept in memory and mirrored to a CSV file that is rewritten on
/// every change. One lock covers the cache and the file.
pub struct FileReminderStorage {
    path: PathBuf,
    timezone: Tz,
    cache: Mutex<HashMap<ReminderId, Record>>,
}

impl FileReminderStorage {
    pub fn new(path: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            path: path.into(),
            timezone,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("reminders"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn persist(&self, cache: &HashMap<ReminderId, Record>) -> Result<(), StorageError> {
        let contents = model::write_records(cache.values())?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        if let Err(error) = write_synced(&temp_path, &contents).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(error.into());
        }
        if let Err(error) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(error.into());
        }

        Ok(())
    }
}

async fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

#[async_trait]
impl ReminderStorage for FileReminderStorage {
    async fn load(&self) -> Result<(), StorageError> {
        let mut cache = self.cache.lock().await;
        cache.clear();

        let contents = fs::read(&self.path)
            .await
            .map_err(|source| StorageError::Open {
                path: self.path.clone(),
                source,
            })?;
        *cache = model::read_records(&contents, &self.timezone)?;

        log::info!(
            "Loaded {} reminders from {}",
            cache.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn data(&self) -> Vec<Record> {
        let cache = self.cache.lock().await;
        cache.values().cloned().collect()
    }

    async fn save(&self, record: Record) -> Result<(), StorageError> {
        let mut cache = self.cache.lock().await;
        let id = record.id.clone();
        let previous = cache.insert(id.clone(), record);

        if let Err(error) = self.persist(&cache).await {
            match previous {
                Some(previous) => cache.insert(id, previous),
                None => cache.remove(&id),
            };
            return Err(error);
        }

        log::info!("Saved reminder {id}");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let mut cache = self.cache.lock().await;
        let removed = cache.remove(id);

        if let Err(error) = self.persist(&cache).await {
            if let Some(removed) = removed {
                cache.insert(removed.id.clone(), removed);
            }
            return Err(error);
        }

        if removed.is_some() {
            log::info!("Deleted reminder {id}");
        }
        Ok(())
    }
}
