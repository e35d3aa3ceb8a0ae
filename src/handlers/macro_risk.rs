// src/handlers/macro_risk.rs
use chrono::Duration;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::models::{CycleSignal, TrendMetric};
use crate::services::frame::{
    self, align_and_derive, TimeSeriesTable, FREIGHT_INDEX, HOUSING_SALES,
};
use crate::services::fred::{MACRO_LOOKBACK_DAYS, MACRO_SERIES};
use crate::state::AppState;

/// One year of forward-filled daily rows, the app's trend window.
const TREND_PERIODS: usize = 252;

#[derive(Serialize)]
struct MacroResponse {
    /// "ok", "empty" (providers returned nothing usable) or
    /// "missing_credential" (no FRED key configured).
    status: &'static str,
    table: TimeSeriesTable,
    housing: Option<TrendMetric>,
    freight: Option<TrendMetric>,
    signal: Option<CycleSignal>,
}

impl MacroResponse {
    fn degraded(status: &'static str) -> Self {
        MacroResponse {
            status,
            table: TimeSeriesTable::default(),
            housing: None,
            freight: None,
            signal: None,
        }
    }
}

pub async fn get_macro_overview(state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request for macro overview");

    let fred = match &state.fred {
        Some(fred) => fred,
        None => {
            warn!("Macro overview requested without a FRED credential");
            return Ok(warp::reply::json(&MacroResponse::degraded(
                "missing_credential",
            )));
        }
    };

    let key = macro_cache_key();
    let table = state
        .macro_cache
        .get_or_compute(key, || async {
            let raw = fred
                .fetch_macro_series(MACRO_SERIES, Duration::days(MACRO_LOOKBACK_DAYS))
                .await;
            align_and_derive(&raw)
        })
        .await;

    if table.is_empty() {
        warn!("Macro table came back empty");
        return Ok(warp::reply::json(&MacroResponse::degraded("empty")));
    }

    let housing = frame::trend_metric(&table, HOUSING_SALES, TREND_PERIODS);
    let freight = frame::trend_metric(&table, FREIGHT_INDEX, TREND_PERIODS);
    let signal = match (&housing, &freight) {
        (Some(h), Some(f)) => Some(frame::cycle_signal(h.trend, f.trend)),
        _ => None,
    };

    Ok(warp::reply::json(&MacroResponse {
        status: "ok",
        table,
        housing,
        freight,
        signal,
    }))
}

fn macro_cache_key() -> String {
    let ids: Vec<&str> = MACRO_SERIES.iter().map(|d| d.series_id).collect();
    format!("macro:{}:{}", MACRO_LOOKBACK_DAYS, ids.join(","))
}
