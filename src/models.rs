// src/models.rs
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use chrono::NaiveDate;

/// Sparse date -> value observations at the provider's native frequency.
/// BTreeMap keeps dates sorted, which the aligner relies on.
pub type RawSeries = BTreeMap<NaiveDate, f64>;

/// Point-in-time quote for one ticker. A failed fetch yields all-`None`
/// fields rather than an error, so one bad ticker never aborts a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Quote {
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub trailing_pe: Option<f64>,
}

impl Quote {
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.currency.is_none() && self.trailing_pe.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub symbol: String,
    pub name: String,
}

/// One valuation table row. Prices are reported in EUR; `None` means the
/// quote fetch failed or the provider had no figure for the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationRow {
    pub ticker: String,
    pub price_eur: Option<f64>,
    pub trailing_pe: Option<f64>,
}

/// Relative change of a column versus its value `periods_back` rows earlier.
#[derive(Debug, Clone, Serialize)]
pub struct TrendMetric {
    pub column: String,
    pub latest: f64,
    pub trend: f64,
    pub periods_back: usize,
}

/// Aggregate reading of the housing/freight leading indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleSignal {
    Stable,
    Mixed,
    Contraction,
}
