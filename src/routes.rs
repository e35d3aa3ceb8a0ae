// src/routes.rs
use std::convert::Infallible;
use std::sync::Arc;

use log::info;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::error::ApiError;
use crate::handlers::{
    equities::{get_performance, get_valuations},
    macro_risk::get_macro_overview,
    search::get_search,
};
use crate::state::AppState;

// Map our custom rejections (and warp's own) onto JSON error bodies, so
// the frontend always gets an inline message instead of a dropped session.
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status();
        message = api_error.message.clone();
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = "Invalid query parameters".to_string();
    } else {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let state_filter = warp::any().map(move || state.clone());

    let macro_route = warp::path!("api" / "v1" / "macro")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_macro_overview);

    let performance_route = warp::path!("api" / "v1" / "equities" / "performance")
        .and(warp::get())
        .and(warp::query())
        .and(state_filter.clone())
        .and_then(get_performance);

    let valuations_route = warp::path!("api" / "v1" / "equities" / "valuations")
        .and(warp::get())
        .and(warp::query())
        .and(state_filter.clone())
        .and_then(get_valuations);

    let search_route = warp::path!("api" / "v1" / "search")
        .and(warp::get())
        .and(warp::query())
        .and(state_filter.clone())
        .and_then(get_search);

    info!("All routes configured successfully.");

    macro_route
        .or(performance_route)
        .or(valuations_route)
        .or(search_route)
        .recover(handle_rejection)
}
