//! HTTP routes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use countryfx_common::{CountryRecord, RefreshState, Timestamp};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::query::{CountryQuery, ListParams};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Serialize)]
struct RefreshResponse {
    message: &'static str,
    total_countries: u64,
    last_refreshed_at: Timestamp,
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Country Currency & Exchange API",
        "status": "running",
    }))
}

async fn refresh_countries(State(state): State<Arc<AppState>>) -> ApiResult<Json<RefreshResponse>> {
    let summary = state.refresher.refresh().await?;
    Ok(Json(RefreshResponse {
        message: "Countries data refreshed successfully",
        total_countries: summary.total_countries,
        last_refreshed_at: summary.last_refreshed_at,
    }))
}

async fn list_countries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<CountryRecord>>> {
    let query = CountryQuery::try_from(params)?;
    Ok(Json(state.queries.list(&query).await?))
}

async fn get_country(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<CountryRecord>> {
    Ok(Json(state.queries.get(&name).await?))
}

async fn delete_country(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    state.queries.delete(&name).await?;
    state.metrics.country_deleted();
    Ok(Json(json!({
        "message": format!("Country '{name}' deleted successfully"),
    })))
}

async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<RefreshState>> {
    Ok(Json(state.queries.status().await?))
}

async fn get_summary_image(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let (content_type, bytes) = state
        .refresher
        .summary_image()
        .await?
        .ok_or(ApiError::ImageNotFound)?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.to_prometheus(),
    )
}

/// Build the HTTP router over `state`.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/countries/refresh", post(refresh_countries))
        .route("/countries", get(list_countries))
        // static segment wins over the :name capture
        .route("/countries/image", get(get_summary_image))
        .route("/countries/:name", get(get_country).delete(delete_country))
        .route("/status", get(get_status))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}
