// src/services/yahoo.rs
//
// Yahoo Finance client: daily closes via the chart API, point-in-time
// quotes via the quote API, and the lightweight symbol search endpoint.
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{error, info};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::models::{Quote, RawSeries, SearchHit};
use crate::services::frame::{align_and_derive, TimeSeriesTable};
use crate::services::valuation::QuoteSource;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";
const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// At most this many search candidates are returned to the UI.
pub const SEARCH_LIMIT: usize = 5;

pub const PRICE_LOOKBACK_DAYS: i64 = 365;

pub struct YahooClient {
    client: Client,
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooClient {
    pub fn new() -> Self {
        YahooClient {
            client: Client::new(),
        }
    }

    /// Daily closing prices for the requested tickers, outer-joined onto a
    /// common date index. Tickers that fail or come back empty lose their
    /// column; if nothing survives the table is empty. Never errors.
    pub async fn fetch_price_series(
        &self,
        tickers: &[String],
        lookback: Duration,
    ) -> TimeSeriesTable {
        let mut raw: HashMap<String, RawSeries> = HashMap::new();
        for ticker in tickers {
            match self.fetch_closes(ticker, lookback).await {
                Ok(series) if !series.is_empty() => {
                    info!("Yahoo {}: {} closes", ticker, series.len());
                    raw.insert(ticker.clone(), series);
                }
                Ok(_) => {
                    error!("Yahoo returned no close data for {}", ticker);
                }
                Err(e) => {
                    error!("Failed to fetch price history for {}: {}", ticker, e);
                }
            }
        }
        align_and_derive(&raw)
    }

    async fn fetch_closes(&self, ticker: &str, lookback: Duration) -> Result<RawSeries> {
        let end = Utc::now();
        let start = end - lookback;
        let url = format!("{}/{}", CHART_URL, ticker);

        let resp = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<ChartResponse>()
            .await?;

        let result = resp
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| anyhow!("chart response for {} had no result", ticker))?;
        Ok(close_series(result))
    }

    /// Single-ticker quote. Any failure degrades to the all-`None` quote so
    /// batch callers never have to unwind.
    pub async fn fetch_quote(&self, ticker: &str) -> Quote {
        match self.fetch_quote_inner(ticker).await {
            Ok(quote) => quote,
            Err(e) => {
                error!("Failed to fetch quote for {}: {}", ticker, e);
                Quote::default()
            }
        }
    }

    async fn fetch_quote_inner(&self, ticker: &str) -> Result<Quote> {
        let resp = self
            .client
            .get(QUOTE_URL)
            .header("User-Agent", USER_AGENT)
            .query(&[("symbols", ticker)])
            .send()
            .await?
            .error_for_status()?
            .json::<QuoteResponse>()
            .await?;

        let result = resp
            .quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("quote response for {} was empty", ticker))?;

        Ok(Quote {
            price: result.regular_market_price,
            currency: result.currency,
            trailing_pe: result.trailing_pe,
        })
    }

    /// Free-text symbol search, capped at SEARCH_LIMIT hits. Failures are
    /// logged and collapse to an empty list.
    pub async fn search(&self, query: &str) -> Vec<SearchHit> {
        match self.search_inner(query).await {
            Ok(hits) => hits,
            Err(e) => {
                error!("Ticker search for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }

    async fn search_inner(&self, query: &str) -> Result<Vec<SearchHit>> {
        let count = SEARCH_LIMIT.to_string();
        let resp = self
            .client
            .get(SEARCH_URL)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("q", query),
                ("quotesCount", count.as_str()),
                ("newsCount", "0"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;

        Ok(search_hits(resp))
    }
}

#[async_trait]
impl QuoteSource for YahooClient {
    async fn quote(&self, ticker: &str) -> Quote {
        self.fetch_quote(ticker).await
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponseBody,
}

#[derive(Debug, Deserialize)]
struct QuoteResponseBody {
    result: Vec<QuoteResult>,
}

#[derive(Debug, Deserialize)]
struct QuoteResult {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    currency: Option<String>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    quotes: Option<Vec<SearchQuote>>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    symbol: Option<String>,
    shortname: Option<String>,
    longname: Option<String>,
}

/// Zip chart timestamps with closes, dropping null closes (holidays,
/// halted sessions). Timestamps are exchange-local epochs; the calendar
/// date in UTC is close enough for a daily index.
fn close_series(result: ChartResult) -> RawSeries {
    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .and_then(|q| q.close)
        .unwrap_or_default();

    timestamps
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let close = close?;
            let date = DateTime::<Utc>::from_timestamp(ts, 0)?.date_naive();
            Some((date, close))
        })
        .collect()
}

fn search_hits(resp: SearchResponse) -> Vec<SearchHit> {
    resp.quotes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|q| {
            let symbol = q.symbol?;
            let name = q.shortname.or(q.longname).unwrap_or_default();
            Some(SearchHit { symbol, name })
        })
        .take(SEARCH_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_series_drops_null_closes() {
        let result = ChartResult {
            timestamp: Some(vec![1_700_000_000, 1_700_086_400, 1_700_172_800]),
            indicators: Indicators {
                quote: vec![QuoteBlock {
                    close: Some(vec![Some(100.0), None, Some(101.5)]),
                }],
            },
        };
        let series = close_series(result);
        assert_eq!(series.len(), 2);
        assert!(series.values().all(|v| *v > 0.0));
    }

    #[test]
    fn close_series_handles_missing_payload() {
        let result = ChartResult {
            timestamp: None,
            indicators: Indicators { quote: vec![] },
        };
        assert!(close_series(result).is_empty());
    }

    #[test]
    fn search_hits_prefer_short_name_and_skip_nameless_symbols() {
        let resp = SearchResponse {
            quotes: Some(vec![
                SearchQuote {
                    symbol: Some("PLTR".into()),
                    shortname: Some("Palantir Technologies Inc.".into()),
                    longname: Some("Palantir Technologies Inc. Class A".into()),
                },
                SearchQuote {
                    symbol: None,
                    shortname: Some("orphan".into()),
                    longname: None,
                },
            ]),
        };
        let hits = search_hits(resp);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol, "PLTR");
        assert_eq!(hits[0].name, "Palantir Technologies Inc.");
    }
}
