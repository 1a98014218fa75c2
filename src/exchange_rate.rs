use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Currency code to rate against the base currency, for one day.
pub type RateRecord = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub rates: RateRecord,
}

impl DailySnapshot {
    pub fn new(date: NaiveDate, rates: RateRecord) -> Self {
        Self { date, rates }
    }

    /// Store key for the snapshot, e.g. `2024-06-01`.
    pub fn key(&self) -> String {
        date_key(self.date)
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
