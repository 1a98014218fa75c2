use chrono::NaiveDate;
use log::{error, info};

use crate::{
    exchange_rate::{DailySnapshot, RateRecord, date_key},
    fetcher::{RateSource, RetryingFetcher},
    store::RateStore,
    synchronizer::{SyncOutcome, Synchronizer},
    transform::transform,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    AlreadySynced,
    Reconciled(RateRecord),
    Fetched(DailySnapshot),
    /// Nothing stored anywhere and the API couldn't be reached.
    NoData,
}

/// One daily run: reuse what the stores hold, otherwise fetch and write to both.
pub async fn run<S, C, D>(
    fetcher: &RetryingFetcher<S>,
    cache: &C,
    durable: &D,
    date: NaiveDate,
) -> RunOutcome
where
    S: RateSource,
    C: RateStore,
    D: RateStore,
{
    match Synchronizer::new(cache, durable).reconcile(date).await {
        SyncOutcome::AlreadySynced => RunOutcome::AlreadySynced,
        SyncOutcome::Reconciled(record) => RunOutcome::Reconciled(record),
        SyncOutcome::NeedsFetch => {
            info!("No stored FX rates for {}, calling the API.", date_key(date));
            let Some(raw) = fetcher.fetch_rates().await else {
                error!("No FX rates stored for {}.", date_key(date));
                return RunOutcome::NoData;
            };

            let snapshot = transform(raw, date);
            cache.write(&snapshot).await;
            durable.write(&snapshot).await;

            RunOutcome::Fetched(snapshot)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use anyhow::Result;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        cache_store::CacheStore, durable_store::JsonFileStore, fetcher::RetryPolicy,
        latest_rates::LatestRates, store::memory::MemoryStore,
    };

    struct StubSource {
        up: bool,
        calls: AtomicU32,
    }

    impl StubSource {
        fn new(up: bool) -> Self {
            Self {
                up,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl RateSource for StubSource {
        async fn fetch_latest(&self) -> Result<LatestRates> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.up {
                anyhow::bail!("503 Service Unavailable");
            }

            Ok(LatestRates {
                base_code: Some("USD".to_string()),
                rates: [
                    ("USD".to_string(), 1.0),
                    ("EUR".to_string(), 0.91),
                    ("JPY".to_string(), 155.2),
                ]
                .into_iter()
                .collect(),
            })
        }
    }

    fn fetcher(up: bool) -> RetryingFetcher<StubSource> {
        RetryingFetcher::new(
            StubSource::new(up),
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::ZERO,
            },
        )
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn calls(fetcher: &RetryingFetcher<StubSource>) -> u32 {
        fetcher.source().calls.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn empty_stores_fetch_and_fill_both() {
        let fetcher = fetcher(true);
        let cache = MemoryStore::default();
        let durable = MemoryStore::default();

        let snapshot = match run(&fetcher, &cache, &durable, day()).await {
            RunOutcome::Fetched(snapshot) => snapshot,
            other => panic!("expected a fetch, got {:?}", other),
        };
        assert!(!snapshot.rates.contains_key("USD"));
        assert_eq!(cache.get(day()), Some(snapshot.rates.clone()));
        assert_eq!(durable.get(day()), Some(snapshot.rates));
        assert_eq!(calls(&fetcher), 1);
    }

    #[tokio::test]
    async fn second_run_same_day_does_not_fetch() {
        let fetcher = fetcher(true);
        let cache = MemoryStore::default();
        let durable = MemoryStore::default();

        run(&fetcher, &cache, &durable, day()).await;
        let outcome = run(&fetcher, &cache, &durable, day()).await;

        assert_eq!(outcome, RunOutcome::AlreadySynced);
        assert_eq!(calls(&fetcher), 1);
        assert_eq!(durable.writes(), 1);
    }

    #[tokio::test]
    async fn api_down_writes_nothing() {
        let fetcher = fetcher(false);
        let cache = MemoryStore::default();
        let durable = MemoryStore::default();

        let outcome = run(&fetcher, &cache, &durable, day()).await;

        assert_eq!(outcome, RunOutcome::NoData);
        assert_eq!(calls(&fetcher), 3);
        assert_eq!(cache.writes() + durable.writes(), 0);
    }

    #[tokio::test]
    async fn runs_on_file_store_alone_when_cache_is_down() {
        let dir = tempdir().unwrap();
        let durable = JsonFileStore::new(dir.path().join("currency_rates.json"));
        let cache = CacheStore::unavailable(Duration::from_secs(86_400));
        let fetcher = fetcher(true);

        let snapshot = match run(&fetcher, &cache, &durable, day()).await {
            RunOutcome::Fetched(snapshot) => snapshot,
            other => panic!("expected a fetch, got {:?}", other),
        };
        let second = run(&fetcher, &cache, &durable, day()).await;

        assert_eq!(second, RunOutcome::Reconciled(snapshot.rates.clone()));
        assert_eq!(calls(&fetcher), 1);

        let text = std::fs::read_to_string(durable.path()).unwrap();
        assert_eq!(text.matches("2024-06-01").count(), 1);
        assert_eq!(durable.read_date(day()).await, Some(snapshot.rates));
    }

    #[tokio::test]
    async fn unreadable_file_entry_is_healed_by_a_fetch() {
        let dir = tempdir().unwrap();
        let durable = JsonFileStore::new(dir.path().join("currency_rates.json"));
        std::fs::write(durable.path(), r#"{"2024-06-01": "oops"}"#).unwrap();
        let cache = MemoryStore::default();
        let fetcher = fetcher(true);

        let outcome = run(&fetcher, &cache, &durable, day()).await;

        assert!(matches!(outcome, RunOutcome::Fetched(_)));
        let cached = cache.get(day());
        assert!(cached.is_some());
        assert_eq!(durable.read_date(day()).await, cached);
    }
}
