// src/services/fred.rs
use chrono::{Duration, Utc};
use log::{error, info};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

use crate::models::RawSeries;
use crate::services::frame::{FREIGHT_INDEX, HOUSING_SALES, POLICY_RATE, REPO_RATE};

pub type Result<T> = std::result::Result<T, crate::BoxError>;

const FRED_OBSERVATIONS_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Three years of history, enough for the 1-year trend windows plus context.
pub const MACRO_LOOKBACK_DAYS: i64 = 365 * 3;

pub struct SeriesDef {
    pub series_id: &'static str,
    pub column: &'static str,
}

/// The dashboard's macro inputs: fed funds rate, SOFR, existing home sales
/// (monthly), freight services index (monthly).
pub const MACRO_SERIES: &[SeriesDef] = &[
    SeriesDef { series_id: "DFF", column: POLICY_RATE },
    SeriesDef { series_id: "SOFR", column: REPO_RATE },
    SeriesDef { series_id: "EXHOSLUSM495S", column: HOUSING_SALES },
    SeriesDef { series_id: "TSIFRGHT", column: FREIGHT_INDEX },
];

pub struct FredClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

impl FredClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        FredClient {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// `None` when FRED_API_KEY is unset or blank. The caller treats a
    /// missing credential as a degraded mode, not a startup failure.
    pub fn from_env() -> Option<Self> {
        env::var("FRED_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(FredClient::new)
    }

    /// Fetch one series over the lookback window at its native frequency.
    pub async fn fetch_series(&self, series_id: &str, lookback: Duration) -> Result<RawSeries> {
        let end = Utc::now().date_naive();
        let start = end - lookback;
        info!("Fetching FRED series {} from {} to {}", series_id, start, end);

        let start_str = start.to_string();
        let end_str = end.to_string();
        let resp = self
            .client
            .get(FRED_OBSERVATIONS_URL)
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start_str.as_str()),
                ("observation_end", end_str.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<ObservationsResponse>()
            .await?;

        Ok(parse_observations(resp))
    }

    /// Fetch every defined series, keyed by dashboard column name. A failed
    /// series is logged and absent from the map; an empty one is present
    /// with no points, so callers can tell the two apart.
    pub async fn fetch_macro_series(
        &self,
        defs: &[SeriesDef],
        lookback: Duration,
    ) -> HashMap<String, RawSeries> {
        let mut out = HashMap::new();
        for def in defs {
            match self.fetch_series(def.series_id, lookback).await {
                Ok(series) => {
                    info!("FRED {}: {} observations", def.series_id, series.len());
                    out.insert(def.column.to_string(), series);
                }
                Err(e) => {
                    error!("Failed to fetch FRED series {}: {}", def.series_id, e);
                }
            }
        }
        out
    }
}

/// FRED marks missing observations with a literal "." value; those are
/// skipped along with anything else that does not parse.
fn parse_observations(resp: ObservationsResponse) -> RawSeries {
    let mut series = RawSeries::new();
    for obs in resp.observations {
        if obs.value.trim() == "." {
            continue;
        }
        let date = match chrono::NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => continue,
        };
        match obs.value.trim().parse::<f64>() {
            Ok(v) => {
                series.insert(date, v);
            }
            Err(_) => continue,
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(date: &str, value: &str) -> Observation {
        Observation {
            date: date.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn parse_skips_missing_markers_and_junk() {
        let resp = ObservationsResponse {
            observations: vec![
                obs("2024-01-02", "5.33"),
                obs("2024-01-03", "."),
                obs("2024-01-04", "5.31"),
                obs("not-a-date", "5.30"),
                obs("2024-01-05", "n/a"),
            ],
        };
        let series = parse_observations(resp);
        assert_eq!(series.len(), 2);
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(series.get(&d), Some(&5.33));
    }

    #[test]
    fn parse_keeps_dates_sorted() {
        let resp = ObservationsResponse {
            observations: vec![obs("2024-02-01", "2.0"), obs("2024-01-01", "1.0")],
        };
        let series = parse_observations(resp);
        let dates: Vec<_> = series.keys().collect();
        assert!(dates[0] < dates[1]);
    }
}
