mod aggregator;
mod catalog;
mod classifier;
mod config;
mod db;
mod entities;
mod error;
mod ingest;
mod models;
mod query;
mod routes;
mod tmdb;

use std::{sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;

use crate::{
    catalog::CatalogFeed,
    classifier::{AiGatewayClient, ReviewSource, SentimentClassifier},
    config::Config,
    ingest::MovieLocks,
    tmdb::TmdbClient,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: DatabaseConnection,
    pub catalog: Arc<dyn CatalogFeed>,
    pub classifier: Arc<dyn SentimentClassifier>,
    pub reviews: Arc<dyn ReviewSource>,
    pub locks: MovieLocks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,reelpulse=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("reelpulse/0.1")
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let db = db::connect_and_migrate(config.database_url.as_str()).await?;

    let tmdb = TmdbClient::new(
        http.clone(),
        config.tmdb_access_token.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_region.clone(),
        config.tmdb_language.clone(),
        config.tmdb_rps,
    );

    let gateway = Arc::new(AiGatewayClient::new(
        http,
        config.ai_api_key.clone(),
        config.ai_gateway_url.clone(),
        config.ai_model.clone(),
        config.reviews_per_movie,
        config.ai_rps,
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        catalog: Arc::new(tmdb),
        classifier: gateway.clone(),
        reviews: gateway,
        locks: MovieLocks::new(),
    });

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
