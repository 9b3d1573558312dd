use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState, catalog,
    error::AppResult,
    ingest, query,
    models::{AnalyzeRequest, ClassificationResult, IngestOutcome, MovieDetail, MovieWithSentiment},
};

const MAX_LIST_LIMIT: u64 = 200;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/movies", get(list_movies))
        .route("/api/movies/{id}", get(get_movie))
        .route("/api/movies/{id}/reviews", post(collect_reviews))
        .route("/api/analyze", post(analyze))
        .route("/api/sync", post(sync))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<u64>,
    q: Option<String>,
}

async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Vec<MovieWithSentiment>>> {
    let limit = params.limit.unwrap_or(state.config.list_limit).clamp(1, MAX_LIST_LIMIT);
    let movies = match params.q.as_deref() {
        Some(q) => query::search_movies(&state.db, q, limit).await?,
        None => query::list_movies(&state.db, limit).await?,
    };
    Ok(Json(movies))
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    recent: Option<u64>,
}

async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(params): Query<DetailQuery>,
) -> AppResult<Json<MovieDetail>> {
    let recent = params.recent.unwrap_or(state.config.recent_reviews);
    Ok(Json(query::get_movie(&state.db, id, recent).await?))
}

async fn collect_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<IngestOutcome>)> {
    let outcome =
        ingest::collect_reviews(&state.db, state.reviews.as_ref(), &state.locks, id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> AppResult<Json<ClassificationResult>> {
    let mut texts = req.reviews;
    if let Some(text) = req.text.as_deref() {
        texts.extend(ingest::split_lines(text));
    }
    Ok(Json(ingest::analyze(state.classifier.as_ref(), texts).await?))
}

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    page: Option<u32>,
}

async fn sync(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SyncQuery>,
) -> AppResult<Json<Value>> {
    let page = params.page.unwrap_or(1).max(1);
    let count = catalog::sync(&state.db, state.catalog.as_ref(), page).await?;
    Ok(Json(json!({ "count": count })))
}
