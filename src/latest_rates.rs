use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Body of the `latest` endpoint. Missing fields fall back to empty values.
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct LatestRates {
    #[serde(default)]
    pub base_code: Option<String>,
    #[serde(default)]
    pub rates: BTreeMap<String, f64>,
}
