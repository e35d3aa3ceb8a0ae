// src/handlers/search.rs
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::models::SearchHit;
use crate::state::AppState;

/// Queries shorter than this return nothing; the search box fires on
/// every keystroke and two characters match half the exchange.
const MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Serialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

pub async fn get_search(query: SearchQuery, state: Arc<AppState>) -> Result<Json, Rejection> {
    let q = query.q.trim().to_string();
    if q.len() < MIN_QUERY_LEN {
        debug!("Search query {:?} below minimum length", q);
        return Ok(warp::reply::json(&SearchResponse { hits: Vec::new() }));
    }
    info!("Handling ticker search for {:?}", q);

    let key = q.to_lowercase();
    let hits = state
        .search_cache
        .get_or_compute(key, || async { state.yahoo.search(&q).await })
        .await;

    Ok(warp::reply::json(&SearchResponse { hits }))
}
