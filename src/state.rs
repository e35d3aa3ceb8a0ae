// src/state.rs
use log::{info, warn};

use crate::models::SearchHit;
use crate::services::cache::{TtlCache, MACRO_TTL, MARKET_TTL};
use crate::services::frame::TimeSeriesTable;
use crate::services::fred::FredClient;
use crate::services::valuation::ValuationBatch;
use crate::services::yahoo::YahooClient;

/// Everything the handlers share: the provider clients and one TTL cache
/// per data category (macro daily, market data hourly).
pub struct AppState {
    pub fred: Option<FredClient>,
    pub yahoo: YahooClient,
    pub macro_cache: TtlCache<String, TimeSeriesTable>,
    pub price_cache: TtlCache<Vec<String>, TimeSeriesTable>,
    pub valuation_cache: TtlCache<Vec<String>, ValuationBatch>,
    pub search_cache: TtlCache<String, Vec<SearchHit>>,
}

impl AppState {
    pub fn from_env() -> Self {
        let fred = FredClient::from_env();
        match fred {
            Some(_) => info!("FRED credential found"),
            None => warn!("FRED_API_KEY not set; macro endpoints will serve empty data"),
        }

        AppState {
            fred,
            yahoo: YahooClient::new(),
            macro_cache: TtlCache::new(MACRO_TTL),
            price_cache: TtlCache::new(MARKET_TTL),
            valuation_cache: TtlCache::new(MARKET_TTL),
            search_cache: TtlCache::new(MARKET_TTL),
        }
    }
}
