use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{error, info, warn};
use redis::{AsyncCommands, RedisError, aio::MultiplexedConnection};

use crate::{
    exchange_rate::{DailySnapshot, RateRecord, date_key},
    store::RateStore,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis-backed cache of daily records, one key per date with an expiry.
///
/// The connection is made once. If that fails the handle stays unavailable for
/// the whole run and every operation turns into a logged no-op.
pub struct CacheStore {
    conn: Option<MultiplexedConnection>,
    ttl: Duration,
}

impl CacheStore {
    pub async fn connect(url: &str, ttl: Duration) -> Self {
        match open_connection(url).await {
            Ok(conn) => {
                info!("Connected to Redis successfully.");
                Self {
                    conn: Some(conn),
                    ttl,
                }
            }
            Err(e) if is_connection_failure(&e) => {
                warn!(
                    "Failed to connect to Redis. Ensure the Redis server is running: {:#}",
                    e
                );
                Self::unavailable(ttl)
            }
            Err(e) => {
                error!("Redis error occurred: {:#}", e);
                Self::unavailable(ttl)
            }
        }
    }

    pub fn unavailable(ttl: Duration) -> Self {
        Self { conn: None, ttl }
    }

    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    pub async fn write_with_ttl(&self, snapshot: &DailySnapshot, ttl: Duration) {
        let Some(conn) = self.connection("storage") else {
            return;
        };

        let key = snapshot.key();
        match set_record(conn, &key, &snapshot.rates, ttl).await {
            Ok(()) => info!(
                "FX rates for {} stored in Redis (expires in {} seconds).",
                key,
                ttl.as_secs()
            ),
            Err(e) => error!("Can't store FX rates for {} in Redis: {:#}", key, e),
        }
    }

    fn connection(&self, operation: &str) -> Option<MultiplexedConnection> {
        if self.conn.is_none() {
            warn!("Redis is not available. Skipping Redis {}.", operation);
        }
        self.conn.clone()
    }
}

impl RateStore for CacheStore {
    async fn has_date(&self, date: NaiveDate) -> bool {
        let Some(mut conn) = self.connection("check") else {
            return false;
        };

        let key = date_key(date);
        let found: redis::RedisResult<bool> = conn.exists(&key).await;
        match found {
            Ok(true) => {
                info!("Data for {} exists in Redis.", key);
                true
            }
            Ok(false) => false,
            Err(e) => {
                error!("Redis check for {} failed: {:#}", key, e);
                false
            }
        }
    }

    async fn read_date(&self, date: NaiveDate) -> Option<RateRecord> {
        let conn = self.connection("read")?;

        let key = date_key(date);
        match get_record(conn, &key).await {
            Ok(stored) => stored.and_then(|text| decode_record(&key, &text)),
            Err(e) => {
                error!("Can't read FX rates for {} from Redis: {:#}", key, e);
                None
            }
        }
    }

    async fn write(&self, snapshot: &DailySnapshot) {
        self.write_with_ttl(snapshot, self.ttl).await
    }
}

async fn open_connection(url: &str) -> Result<MultiplexedConnection> {
    let client = redis::Client::open(url).context("Invalid Redis URL")?;
    let mut conn = tokio::time::timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection())
        .await
        .context("Timed out connecting to Redis")??;

    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    Ok(conn)
}

/// Server unreachable or not answering, as opposed to a misconfiguration.
fn is_connection_failure(e: &anyhow::Error) -> bool {
    if e.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
        return true;
    }
    e.downcast_ref::<RedisError>().is_some_and(|e| {
        e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() || e.is_timeout()
    })
}

/// Cached values are the record as JSON text.
fn encode_record(record: &RateRecord) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

fn decode_record(key: &str, text: &str) -> Option<RateRecord> {
    match serde_json::from_str(text) {
        Ok(record) => Some(record),
        Err(e) => {
            error!("Cached value for {} is not a rate record: {}", key, e);
            None
        }
    }
}

async fn get_record(mut conn: MultiplexedConnection, key: &str) -> Result<Option<String>> {
    let stored: Option<String> = conn.get(key).await?;

    Ok(stored)
}

async fn set_record(
    mut conn: MultiplexedConnection,
    key: &str,
    record: &RateRecord,
    ttl: Duration,
) -> Result<()> {
    let text = encode_record(record)?;
    let _: () = conn.set_ex(key, text, ttl.as_secs()).await?;

    Ok(())
}
