use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::{Map, Value, ser::PrettyFormatter};

use crate::{
    exchange_rate::{DailySnapshot, RateRecord, date_key},
    store::RateStore,
};

/// Whole on-disk document: date key to rate record, in insertion order.
type Document = Map<String, Value>;

/// Append-only journal of daily records kept in one JSON document.
///
/// Every write reads the whole file and rewrites it in full.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file doesn't exist yet.
    async fn load(&self) -> Result<Option<Document>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Can't read {}", self.path.display()));
            }
        };

        let document = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a JSON object", self.path.display()))?;

        Ok(Some(document))
    }

    async fn save(&self, document: &Document) -> Result<()> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        document.serialize(&mut serializer)?;

        tokio::fs::write(&self.path, buf)
            .await
            .with_context(|| format!("Can't write {}", self.path.display()))
    }

    /// Keeps an unreadable document around before it gets replaced. Earlier
    /// backups are never overwritten: `<path>.bak`, then `<path>.1.bak`, ...
    async fn set_aside(&self) {
        let backup = self.backup_path().await;

        match tokio::fs::rename(&self.path, &backup).await {
            Ok(()) => warn!("Moved unreadable {} to {}", self.path.display(), backup.display()),
            Err(e) => warn!("Can't move {} aside: {}", self.path.display(), e),
        }
    }

    async fn backup_path(&self) -> PathBuf {
        let mut generation = 0u32;
        loop {
            let mut name = self.path.clone().into_os_string();
            if generation > 0 {
                name.push(format!(".{}", generation));
            }
            name.push(".bak");
            let candidate = PathBuf::from(name);

            if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return candidate;
            }
            generation += 1;
        }
    }
}

impl RateStore for JsonFileStore {
    async fn has_date(&self, date: NaiveDate) -> bool {
        let key = date_key(date);
        match self.load().await {
            Ok(Some(document)) if document.contains_key(&key) => {
                info!("Data for {} exists in JSON.", key);
                true
            }
            Ok(_) => false,
            Err(e) => {
                error!("{:#}", e);
                false
            }
        }
    }

    async fn read_date(&self, date: NaiveDate) -> Option<RateRecord> {
        let key = date_key(date);
        let document = match self.load().await {
            Ok(document) => document?,
            Err(e) => {
                error!("{:#}", e);
                return None;
            }
        };

        let value = document.get(&key)?.clone();
        match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                error!("Entry {} in {} is not a rate record: {}", key, self.path.display(), e);
                None
            }
        }
    }

    async fn write(&self, snapshot: &DailySnapshot) {
        let mut document = match self.load().await {
            Ok(Some(document)) => document,
            Ok(None) => Document::new(),
            Err(e) => {
                error!("{:#}. Starting a fresh document.", e);
                self.set_aside().await;
                Document::new()
            }
        };

        let key = snapshot.key();
        if let Some(existing) = document.get(&key) {
            if serde_json::from_value::<RateRecord>(existing.clone()).is_ok() {
                info!("No new data to update.");
                return;
            }
            warn!("Replacing unreadable entry {} in {}.", key, self.path.display());
        }

        let value = match serde_json::to_value(&snapshot.rates) {
            Ok(value) => value,
            Err(e) => {
                error!("Can't encode FX rates for {}: {}", key, e);
                return;
            }
        };
        document.insert(key.clone(), value);

        match self.save(&document).await {
            Ok(()) => info!("FX rates for {} stored in JSON.", key),
            Err(e) => error!("{:#}", e),
        }
    }
}
