use chrono::NaiveDate;
use log::{info, warn};

use crate::{
    exchange_rate::{DailySnapshot, RateRecord, date_key},
    store::RateStore,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Both stores already hold the day.
    AlreadySynced,
    /// One store had the day and it was copied into the other.
    Reconciled(RateRecord),
    /// Neither store can answer; the rates have to be fetched.
    NeedsFetch,
}

/// Decides whether a fetch is needed and heals whichever store lacks the day.
///
/// The durable store is the long-term source of truth; the cache may expire and
/// is refilled from it.
pub struct Synchronizer<'a, C, D> {
    cache: &'a C,
    durable: &'a D,
}

impl<'a, C: RateStore, D: RateStore> Synchronizer<'a, C, D> {
    pub fn new(cache: &'a C, durable: &'a D) -> Self {
        Self { cache, durable }
    }

    pub async fn reconcile(&self, date: NaiveDate) -> SyncOutcome {
        let key = date_key(date);
        let in_durable = self.durable.has_date(date).await;
        let in_cache = self.cache.has_date(date).await;

        match (in_durable, in_cache) {
            (true, true) => {
                info!("Data for {} is in both stores. No API call needed.", key);
                SyncOutcome::AlreadySynced
            }
            (true, false) => match self.durable.read_date(date).await {
                Some(record) => {
                    info!("Syncing durable data to cache for {}.", key);
                    self.cache
                        .write(&DailySnapshot::new(date, record.clone()))
                        .await;
                    SyncOutcome::Reconciled(record)
                }
                None => {
                    warn!("Durable entry for {} can't be read back.", key);
                    SyncOutcome::NeedsFetch
                }
            },
            (false, true) => match self.cache.read_date(date).await {
                Some(record) => {
                    info!("Syncing cached data to durable store for {}.", key);
                    self.durable
                        .write(&DailySnapshot::new(date, record.clone()))
                        .await;
                    SyncOutcome::Reconciled(record)
                }
                None => {
                    warn!("Cached entry for {} can't be read back.", key);
                    SyncOutcome::NeedsFetch
                }
            },
            (false, false) => SyncOutcome::NeedsFetch,
        }
    }
}
