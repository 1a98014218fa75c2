use anyhow::Result;
use chrono::Local;
use log::{info, warn};

use cache_store::CacheStore;
use config::Config;
use durable_store::JsonFileStore;
use fetcher::{HttpRateSource, RetryPolicy, RetryingFetcher};
use pipeline::RunOutcome;

mod cache_store;
mod config;
mod durable_store;
mod exchange_rate;
mod fetcher;
mod latest_rates;
mod logging;
mod pipeline;
mod store;
mod synchronizer;
mod transform;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let today = Local::now().date_naive();
    logging::init(&config.log_dir, today);

    let cache = CacheStore::connect(&config.redis_url, config.cache_ttl).await;
    if !cache.is_available() {
        warn!("Continuing without the Redis cache.");
    }
    let durable = JsonFileStore::new(&config.json_file);
    info!("Durable store: {}", durable.path().display());
    let source = HttpRateSource::new(&config.api_url, config.request_timeout)?;
    let fetcher = RetryingFetcher::new(
        source,
        RetryPolicy {
            max_attempts: config.max_attempts,
            base_delay: config.base_delay,
        },
    );

    match pipeline::run(&fetcher, &cache, &durable, today).await {
        RunOutcome::AlreadySynced => info!("FX rates for {} already stored.", today),
        RunOutcome::Reconciled(record) => {
            info!("FX rates for {} synced ({} currencies).", today, record.len())
        }
        RunOutcome::Fetched(snapshot) => info!(
            "FX rates for {} fetched ({} currencies).",
            today,
            snapshot.rates.len()
        ),
        RunOutcome::NoData => info!("Run finished without FX rates for {}.", today),
    }

    Ok(())
}
