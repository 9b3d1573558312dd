use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub tmdb_access_token: Option<String>,
    pub tmdb_base_url: String,
    pub tmdb_region: String,
    pub tmdb_language: String,
    pub tmdb_rps: u32,
    pub ai_api_key: Option<String>,
    pub ai_gateway_url: String,
    pub ai_model: String,
    pub ai_rps: u32,
    pub reviews_per_movie: usize,
    pub recent_reviews: u64,
    pub list_limit: u64,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelpulse.db?mode=rwc".to_string());

        let tmdb_access_token = secret("TMDB_ACCESS_TOKEN");
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());
        let tmdb_region = std::env::var("TMDB_REGION").unwrap_or_else(|_| "IN".to_string());
        let tmdb_language =
            std::env::var("TMDB_LANGUAGE").unwrap_or_else(|_| "en-US".to_string());
        let tmdb_rps: u32 = parsed("TMDB_RPS").unwrap_or(4);

        let ai_api_key = secret("AI_GATEWAY_API_KEY");
        let ai_gateway_url = std::env::var("AI_GATEWAY_URL")
            .unwrap_or_else(|_| "https://ai.gateway.lovable.dev/v1/chat/completions".to_string());
        let ai_model =
            std::env::var("AI_MODEL").unwrap_or_else(|_| "google/gemini-2.5-flash".to_string());
        let ai_rps: u32 = parsed("AI_RPS").unwrap_or(2);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            tmdb_access_token,
            tmdb_base_url,
            tmdb_region,
            tmdb_language,
            tmdb_rps,
            ai_api_key,
            ai_gateway_url,
            ai_model,
            ai_rps,
            reviews_per_movie: parsed("REVIEWS_PER_MOVIE").unwrap_or(5),
            recent_reviews: parsed("RECENT_REVIEWS").unwrap_or(10),
            list_limit: parsed("LIST_LIMIT").unwrap_or(50),
            http_timeout_secs: parsed("HTTP_TIMEOUT_SECS").unwrap_or(30),
        })
    }
}

/// Blank values count as absent so that an empty `.env` entry behaves like a
/// missing one.
fn secret(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
