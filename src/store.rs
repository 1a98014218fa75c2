use chrono::NaiveDate;

use crate::exchange_rate::{DailySnapshot, RateRecord};

/// Date-keyed storage for rate records. Implementations swallow and log
/// their own failures, reporting them as "absent".
#[allow(async_fn_in_trait)]
pub trait RateStore {
    async fn has_date(&self, date: NaiveDate) -> bool;

    async fn read_date(&self, date: NaiveDate) -> Option<RateRecord>;

    async fn write(&self, snapshot: &DailySnapshot);
}

#[cfg(test)]
pub mod memory {
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use super::*;

    /// In-process store for exercising code that drives a `RateStore`.
    #[derive(Default)]
    pub struct MemoryStore {
        records: Mutex<HashMap<NaiveDate, RateRecord>>,
        writes: AtomicUsize,
        unreadable: bool,
    }

    impl MemoryStore {
        pub fn with(snapshot: &DailySnapshot) -> Self {
            let store = Self::default();
            store.insert(snapshot);
            store
        }

        /// Reports dates as present but fails to hand back their records.
        pub fn unreadable(snapshot: &DailySnapshot) -> Self {
            let mut store = Self::with(snapshot);
            store.unreadable = true;
            store
        }

        pub fn get(&self, date: NaiveDate) -> Option<RateRecord> {
            self.records.lock().unwrap().get(&date).cloned()
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn insert(&self, snapshot: &DailySnapshot) {
            self.records
                .lock()
                .unwrap()
                .insert(snapshot.date, snapshot.rates.clone());
        }
    }

    impl RateStore for MemoryStore {
        async fn has_date(&self, date: NaiveDate) -> bool {
            self.records.lock().unwrap().contains_key(&date)
        }

        async fn read_date(&self, date: NaiveDate) -> Option<RateRecord> {
            if self.unreadable {
                return None;
            }
            self.get(date)
        }

        async fn write(&self, snapshot: &DailySnapshot) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.insert(snapshot);
        }
    }
}
