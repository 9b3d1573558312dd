use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    catalog::CatalogFeed,
    error::{AppResult, Error},
};

pub struct TmdbClient {
    client: reqwest::Client,
    access_token: Option<String>,
    base_url: String,
    region: String,
    language: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        access_token: Option<String>,
        base_url: String,
        region: String,
        language: String,
        rps: u32,
    ) -> Self {
        if access_token.is_none() {
            warn!("TMDB_ACCESS_TOKEN not set, catalog sync will fail");
        }

        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, access_token, base_url, region, language, limiter }
    }
}

#[async_trait]
impl CatalogFeed for TmdbClient {
    async fn now_playing(&self, page: u32) -> AppResult<CatalogPage> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| Error::Configuration("TMDB_ACCESS_TOKEN is not set".to_string()))?;

        self.limiter.until_ready().await;

        let url = format!("{}/movie/now_playing", self.base_url.trim_end_matches('/'));
        debug!(page = page, region = %self.region, "fetching now playing");

        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("region", self.region.as_str()), ("language", self.language.as_str())])
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "TMDB error");
            return Err(Error::UpstreamUnavailable(format!("TMDB returned {status}")));
        }

        let page: CatalogPage = resp
            .json()
            .await
            .map_err(|e| Error::InvalidResponseShape(format!("TMDB now playing: {e}")))?;
        debug!(results = page.results.len(), total_pages = page.total_pages, "fetched catalog page");
        Ok(page)
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    pub results: Vec<CatalogEntry>,
}

/// One movie as listed by the catalog, before normalization.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CatalogEntry {
    pub id: i32,
    pub title: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;

    fn client(url: String, token: Option<&str>) -> TmdbClient {
        TmdbClient::new(
            reqwest::Client::new(),
            token.map(str::to_string),
            url,
            "IN".to_string(),
            "en-US".to_string(),
            100,
        )
    }

    #[tokio::test]
    async fn now_playing_sends_region_and_page() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/movie/now_playing")
            .match_header("authorization", "Bearer tok")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("region".into(), "IN".into()),
                Matcher::UrlEncoded("language".into(), "en-US".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"page":2,"total_pages":3,"results":[
                    {"id":42,"title":"Test Film","poster_path":null,"backdrop_path":"/b.jpg",
                     "release_date":"2025-01-10","overview":"A film.","vote_average":7.5,
                     "vote_count":120}
                ]}"#,
            )
            .create_async()
            .await;

        let page = client(server.url(), Some("tok")).now_playing(2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.page, 2);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, 42);
        assert_eq!(page.results[0].poster_path, None);
        assert_eq!(page.results[0].backdrop_path.as_deref(), Some("/b.jpg"));
    }

    #[tokio::test]
    async fn non_success_is_upstream_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/movie/now_playing")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = client(server.url(), Some("tok")).now_playing(1).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn missing_token_is_configuration_error() {
        let err = client("http://127.0.0.1:9".to_string(), None).now_playing(1).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
