// src/handlers/equities.rs
use chrono::Duration;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::services::frame::{rebase_100, TimeSeriesTable};
use crate::services::valuation::{enrich_valuations, ValuationBatch};
use crate::services::yahoo::PRICE_LOOKBACK_DAYS;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TickersQuery {
    pub tickers: String,
}

#[derive(Serialize)]
struct PerformanceResponse {
    status: &'static str,
    /// Daily closes rebased to 100 on the first shared trading day.
    table: TimeSeriesTable,
}

/// Comma-separated ticker list; empty after trimming is a caller bug.
fn parse_tickers(raw: &str) -> Result<Vec<String>, Rejection> {
    let tickers: Vec<String> = raw
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tickers.is_empty() {
        return Err(warp::reject::custom(ApiError::bad_request(
            "tickers query parameter must name at least one symbol",
        )));
    }
    Ok(tickers)
}

pub async fn get_performance(
    query: TickersQuery,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    let tickers = parse_tickers(&query.tickers)?;
    info!("Handling performance request for {:?}", tickers);

    let closes = state
        .price_cache
        .get_or_compute(tickers.clone(), || async {
            state
                .yahoo
                .fetch_price_series(&tickers, Duration::days(PRICE_LOOKBACK_DAYS))
                .await
        })
        .await;

    if closes.is_empty() {
        return Ok(warp::reply::json(&PerformanceResponse {
            status: "empty",
            table: TimeSeriesTable::default(),
        }));
    }

    Ok(warp::reply::json(&PerformanceResponse {
        status: "ok",
        table: rebase_100(&closes),
    }))
}

#[derive(Serialize)]
struct ValuationResponse {
    status: &'static str,
    #[serde(flatten)]
    batch: ValuationBatch,
}

pub async fn get_valuations(query: TickersQuery, state: Arc<AppState>) -> Result<Json, Rejection> {
    let tickers = parse_tickers(&query.tickers)?;
    info!("Handling valuation request for {:?}", tickers);

    let batch = state
        .valuation_cache
        .get_or_compute(tickers.clone(), || async {
            enrich_valuations(&state.yahoo, &tickers).await
        })
        .await;

    let status = if batch.failed.len() == batch.rows.len() {
        "empty"
    } else {
        "ok"
    };
    Ok(warp::reply::json(&ValuationResponse { status, batch }))
}
