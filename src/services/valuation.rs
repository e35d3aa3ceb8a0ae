// src/services/valuation.rs
//
// Builds the valuation table: one shared EURUSD rate per batch, then one
// quote per ticker. A failed quote keeps its row (with absent fields), so
// the batch always comes back in input order and at input length.
use async_trait::async_trait;
use log::warn;
use serde::Serialize;

use crate::models::{Quote, ValuationRow};

pub const EUR_USD_TICKER: &str = "EURUSD=X";

/// Used when the EURUSD=X quote fails or is non-positive.
pub const EUR_USD_FALLBACK: f64 = 1.05;

/// Seam over the quote provider so the failure paths are testable without
/// the network. Implementations must degrade to the empty quote on error.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, ticker: &str) -> Quote;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValuationBatch {
    pub rows: Vec<ValuationRow>,
    /// Tickers whose quote fetch returned nothing, so the UI can badge
    /// them instead of rendering indistinguishable blanks.
    pub failed: Vec<String>,
}

pub async fn enrich_valuations<S: QuoteSource>(source: &S, tickers: &[String]) -> ValuationBatch {
    let rate = shared_eur_usd_rate(source).await;

    let mut batch = ValuationBatch {
        rows: Vec::with_capacity(tickers.len()),
        failed: Vec::new(),
    };
    for ticker in tickers {
        let quote = source.quote(ticker).await;
        if quote.is_empty() {
            warn!("No quote data for {}; emitting empty valuation row", ticker);
            batch.failed.push(ticker.clone());
        }
        batch.rows.push(ValuationRow {
            ticker: ticker.clone(),
            price_eur: convert_price(quote.price, quote.currency.as_deref(), rate),
            trailing_pe: quote.trailing_pe,
        });
    }
    batch
}

/// One EURUSD=X fetch per batch, never per ticker.
async fn shared_eur_usd_rate<S: QuoteSource>(source: &S) -> f64 {
    match source.quote(EUR_USD_TICKER).await.price {
        Some(rate) if rate > 0.0 => rate,
        _ => {
            warn!(
                "EURUSD rate unavailable, falling back to {}",
                EUR_USD_FALLBACK
            );
            EUR_USD_FALLBACK
        }
    }
}

/// Only USD quotes are converted (EURUSD=X is "1 EUR = rate USD", so USD
/// prices divide by the rate). EUR passes through, and any other currency
/// is left unconverted — a known limitation, not a cross-rate engine.
pub fn convert_price(price: Option<f64>, currency: Option<&str>, eur_usd: f64) -> Option<f64> {
    let price = price?;
    match currency {
        Some("USD") => Some(price / eur_usd),
        _ => Some(price),
    }
}
