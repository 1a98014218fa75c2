use chrono::NaiveDate;

use crate::{exchange_rate::DailySnapshot, latest_rates::LatestRates};

/// Turns an API response into the snapshot for `date`, dropping the base
/// currency's own entry (always 1.0).
pub fn transform(raw: LatestRates, date: NaiveDate) -> DailySnapshot {
    let LatestRates {
        base_code,
        mut rates,
    } = raw;

    if let Some(base) = base_code {
        rates.remove(&base);
    }

    DailySnapshot::new(date, rates)
}
