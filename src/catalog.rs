use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, EntityTrait, NotSet, Set, TransactionTrait,
    sea_query::OnConflict,
};
use tracing::{debug, info};

use crate::{
    entities::movie,
    error::AppResult,
    models::NewMovie,
    tmdb::{CatalogEntry, CatalogPage},
};

const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
const BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/original";

/// Paginated, read-only source of currently relevant movies.
#[async_trait]
pub trait CatalogFeed: Send + Sync {
    async fn now_playing(&self, page: u32) -> AppResult<CatalogPage>;
}

pub fn normalize(entry: &CatalogEntry) -> NewMovie {
    NewMovie {
        tmdb_id: entry.id,
        title: entry.title.trim().to_string(),
        poster_url: image_url(POSTER_BASE, entry.poster_path.as_deref()),
        backdrop_url: image_url(BACKDROP_BASE, entry.backdrop_path.as_deref()),
        release_date: entry
            .release_date
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<jiff::civil::Date>().ok())
            .map(|d| d.to_string()),
        overview: entry.overview.clone().unwrap_or_default(),
        vote_average: entry.vote_average.unwrap_or(0.0),
        vote_count: entry.vote_count.unwrap_or(0),
    }
}

fn image_url(base: &str, path: Option<&str>) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    if path.starts_with('/') {
        Some(format!("{base}{path}"))
    } else {
        Some(format!("{base}/{path}"))
    }
}

/// Fetches one catalog page and upserts every entry on `tmdb_id`. Nothing is
/// written unless the whole page was fetched, and the page is written in a
/// single transaction. Returns the number of movies written.
pub async fn sync(
    db: &DatabaseConnection,
    feed: &dyn CatalogFeed,
    page: u32,
) -> AppResult<usize> {
    let fetched = feed.now_playing(page).await?;

    // Later duplicates of the same external id win, as they would row by row.
    let mut by_tmdb_id: HashMap<i32, usize> = HashMap::new();
    let mut movies: Vec<NewMovie> = Vec::with_capacity(fetched.results.len());
    for entry in &fetched.results {
        let normalized = normalize(entry);
        match by_tmdb_id.get(&normalized.tmdb_id) {
            Some(&idx) => movies[idx] = normalized,
            None => {
                by_tmdb_id.insert(normalized.tmdb_id, movies.len());
                movies.push(normalized);
            },
        }
    }

    if movies.is_empty() {
        info!(page = page, "catalog page empty, nothing to sync");
        return Ok(0);
    }

    let txn = db.begin().await?;
    for m in &movies {
        upsert_movie(&txn, m).await?;
    }
    txn.commit().await?;

    info!(page = page, count = movies.len(), "synced catalog page");
    Ok(movies.len())
}

async fn upsert_movie<C>(conn: &C, m: &NewMovie) -> AppResult<()>
where
    C: ConnectionTrait,
{
    debug!(tmdb_id = m.tmdb_id, title = %m.title, "upserting movie");

    let model = movie::ActiveModel {
        id: NotSet,
        tmdb_id: Set(m.tmdb_id),
        title: Set(m.title.clone()),
        poster_url: Set(m.poster_url.clone()),
        backdrop_url: Set(m.backdrop_url.clone()),
        release_date: Set(m.release_date.clone()),
        overview: Set(m.overview.clone()),
        vote_average: Set(m.vote_average),
        vote_count: Set(m.vote_count),
    };

    movie::Entity::insert(model)
        .on_conflict(
            OnConflict::column(movie::Column::TmdbId)
                .update_columns([
                    movie::Column::Title,
                    movie::Column::PosterUrl,
                    movie::Column::BackdropUrl,
                    movie::Column::ReleaseDate,
                    movie::Column::Overview,
                    movie::Column::VoteAverage,
                    movie::Column::VoteCount,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}
