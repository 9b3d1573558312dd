use std::sync::Arc;

use dashmap::DashMap;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::{
    aggregator,
    classifier::{ReviewSource, SentimentClassifier},
    entities::{movie, review},
    error::{AppResult, Error},
    models::{ClassificationResult, IngestOutcome, SourcedReview},
};

/// Serializes "insert reviews, then recompute the aggregate" per movie.
/// Batches for different movies never wait on each other.
#[derive(Clone, Default)]
pub struct MovieLocks {
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

impl MovieLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire(&self, movie_id: i32) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(movie_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
        lock.lock_owned().await
    }
}

/// Splits a newline separated blob into one entry per line.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Trims every entry and drops blank ones. Fails when nothing is left.
pub fn prepare_batch<I, S>(texts: I) -> AppResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let batch: Vec<String> = texts
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if batch.is_empty() {
        return Err(Error::Validation("at least one non-blank review is required".to_string()));
    }
    Ok(batch)
}

/// Interactive path: one classification call for the whole batch. The verdict
/// goes straight back to the caller and nothing is stored.
pub async fn analyze<I, S>(
    classifier: &dyn SentimentClassifier,
    texts: I,
) -> AppResult<ClassificationResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let batch = prepare_batch(texts)?;
    debug!(count = batch.len(), "analyzing interactive batch");
    classifier.classify(&batch).await
}

/// Persists a batch of labelled reviews for one movie and recomputes its
/// aggregate. Rows and aggregate are committed together or not at all.
pub async fn ingest_reviews(
    db: &DatabaseConnection,
    locks: &MovieLocks,
    movie_id: i32,
    source: &str,
    reviews: Vec<SourcedReview>,
) -> AppResult<IngestOutcome> {
    let rows: Vec<(String, SourcedReview)> = reviews
        .into_iter()
        .filter_map(|r| {
            let text = r.text.trim().to_string();
            (!text.is_empty()).then_some((text, r))
        })
        .collect();

    if rows.is_empty() {
        return Err(Error::Validation("review batch has no non-blank reviews".to_string()));
    }
    if let Some(bad) = rows
        .iter()
        .filter_map(|(_, r)| r.score)
        .find(|s| !s.is_finite() || !(0.0..=1.0).contains(s))
    {
        return Err(Error::Validation(format!("review score {bad} is outside [0, 1]")));
    }

    let _guard = locks.acquire(movie_id).await;

    let txn = db.begin().await?;

    movie::Entity::find_by_id(movie_id).one(&txn).await?.ok_or(Error::MovieNotFound(movie_id))?;

    let now = jiff::Timestamp::now().as_millisecond();
    let mut inserted = Vec::with_capacity(rows.len());
    for (text, r) in rows {
        let score = r.score.unwrap_or_else(|| r.sentiment.fallback_score());
        let model = review::ActiveModel {
            movie_id: Set(movie_id),
            review_text: Set(text),
            sentiment: Set(r.sentiment),
            score: Set(score),
            source: Set(source.to_string()),
            created_at: Set(now),
            ..Default::default()
        };
        inserted.push(model.insert(&txn).await?);
    }

    let sentiment = aggregator::recompute(&txn, movie_id).await?;
    txn.commit().await?;

    info!(
        movie_id = movie_id,
        inserted = inserted.len(),
        total = sentiment.total_reviews,
        "stored review batch"
    );

    Ok(IngestOutcome { reviews: inserted, sentiment })
}

/// Catalog-backed path: asks the review source for labelled reviews of a
/// stored movie and persists them.
pub async fn collect_reviews(
    db: &DatabaseConnection,
    source: &dyn ReviewSource,
    locks: &MovieLocks,
    movie_id: i32,
) -> AppResult<IngestOutcome> {
    let movie =
        movie::Entity::find_by_id(movie_id).one(db).await?.ok_or(Error::MovieNotFound(movie_id))?;

    let reviews = source.fetch_reviews(&movie).await?;
    debug!(movie_id = movie_id, fetched = reviews.len(), "fetched reviews from source");
    if reviews.iter().all(|r| r.text.trim().is_empty()) {
        return Err(Error::InvalidResponseShape(format!(
            "review source returned no reviews for movie {movie_id}"
        )));
    }

    ingest_reviews(db, locks, movie_id, source.source_tag(), reviews).await
}
