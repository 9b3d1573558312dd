use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
    sea_query::{NullOrdering, Order},
};

use crate::{
    entities::{movie, movie_sentiment, review},
    error::{AppResult, Error},
    models::{MovieDetail, MovieWithSentiment},
};

/// Movies joined with their aggregate, newest release first. Movies without a
/// release date sort last.
pub async fn list_movies(
    db: &DatabaseConnection,
    limit: u64,
) -> AppResult<Vec<MovieWithSentiment>> {
    let rows = movie::Entity::find()
        .find_also_related(movie_sentiment::Entity)
        .order_by_with_nulls(movie::Column::ReleaseDate, Order::Desc, NullOrdering::Last)
        .order_by_asc(movie::Column::Id)
        .limit(limit)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(movie, sentiment)| MovieWithSentiment {
            movie,
            sentiment: sentiment.map(Into::into).unwrap_or_default(),
        })
        .collect())
}

/// Movie, aggregate and newest reviews read from one snapshot, so the
/// aggregate always matches the stored review rows.
pub async fn get_movie(db: &DatabaseConnection, id: i32, recent: u64) -> AppResult<MovieDetail> {
    let txn = db.begin().await?;

    let movie = movie::Entity::find_by_id(id).one(&txn).await?.ok_or(Error::MovieNotFound(id))?;
    let sentiment = movie_sentiment::Entity::find_by_id(id).one(&txn).await?;
    let reviews = review::Entity::find()
        .filter(review::Column::MovieId.eq(id))
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .limit(recent)
        .all(&txn)
        .await?;

    txn.commit().await?;

    Ok(MovieDetail { movie, sentiment: sentiment.map(Into::into).unwrap_or_default(), reviews })
}

/// Case-insensitive substring match on the title. A blank query keeps
/// everything.
pub fn search_by_title(movies: Vec<MovieWithSentiment>, query: &str) -> Vec<MovieWithSentiment> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return movies;
    }
    movies.into_iter().filter(|m| m.movie.title.to_lowercase().contains(&needle)).collect()
}

pub async fn search_movies(
    db: &DatabaseConnection,
    query: &str,
    limit: u64,
) -> AppResult<Vec<MovieWithSentiment>> {
    Ok(search_by_title(list_movies(db, limit).await?, query))
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, Set};

    use super::*;
    use crate::{
        db::{insert_test_movie, test_db},
        entities::Sentiment,
        ingest::{MovieLocks, ingest_reviews},
        models::{SentimentSummary, SourcedReview},
    };

    fn titles(movies: &[MovieWithSentiment]) -> Vec<&str> {
        movies.iter().map(|m| m.movie.title.as_str()).collect()
    }

    #[tokio::test]
    async fn list_orders_by_release_date_with_undated_last() {
        let db = test_db().await;
        insert_test_movie(&db, 1, "Old", Some("2023-05-01")).await;
        insert_test_movie(&db, 2, "Undated", None).await;
        insert_test_movie(&db, 3, "New", Some("2024-12-05")).await;

        let movies = list_movies(&db, 10).await.unwrap();
        assert_eq!(titles(&movies), vec!["New", "Old", "Undated"]);

        let limited = list_movies(&db, 2).await.unwrap();
        assert_eq!(titles(&limited), vec!["New", "Old"]);
    }

    #[tokio::test]
    async fn movies_without_reviews_get_default_aggregate() {
        let db = test_db().await;
        let quiet = insert_test_movie(&db, 1, "Quiet", Some("2024-01-01")).await;
        let loud = insert_test_movie(&db, 2, "Loud", Some("2024-02-01")).await;
        ingest_reviews(
            &db,
            &MovieLocks::new(),
            loud.id,
            "test",
            vec![SourcedReview::labelled("Bad", Sentiment::Negative)],
        )
        .await
        .unwrap();

        let movies = list_movies(&db, 10).await.unwrap();

        let quiet_view = movies.iter().find(|m| m.movie.id == quiet.id).unwrap();
        assert_eq!(quiet_view.sentiment, SentimentSummary::default());
        let loud_view = movies.iter().find(|m| m.movie.id == loud.id).unwrap();
        assert_eq!(loud_view.sentiment.overall_sentiment, Sentiment::Negative);
        assert_eq!(loud_view.sentiment.total_reviews, 1);
    }

    #[tokio::test]
    async fn detail_returns_recent_reviews_newest_first() {
        let db = test_db().await;
        let movie = insert_test_movie(&db, 1, "Detail", None).await;
        for (text, at) in [("first", 1_000), ("third", 3_000), ("second", 2_000)] {
            review::ActiveModel {
                movie_id: Set(movie.id),
                review_text: Set(text.to_string()),
                sentiment: Set(Sentiment::Neutral),
                score: Set(0.5),
                source: Set("test".to_string()),
                created_at: Set(at),
                ..Default::default()
            }
            .insert(&db)
            .await
            .unwrap();
        }

        let detail = get_movie(&db, movie.id, 2).await.unwrap();

        let texts: Vec<_> = detail.reviews.iter().map(|r| r.review_text.as_str()).collect();
        assert_eq!(texts, vec!["third", "second"]);
        assert_eq!(detail.movie.title, "Detail");
        // No aggregate row was written for these direct inserts.
        assert_eq!(detail.sentiment, SentimentSummary::default());
    }

    #[tokio::test]
    async fn detail_aggregate_matches_reviews_after_concurrent_ingest() {
        let db = test_db().await;
        let movie = insert_test_movie(&db, 2, "Snapshot", None).await;
        let locks = MovieLocks::new();

        let writer = async {
            for i in 0..5 {
                ingest_reviews(
                    &db,
                    &locks,
                    movie.id,
                    "test",
                    vec![SourcedReview::labelled(format!("review {i}"), Sentiment::Positive)],
                )
                .await
                .unwrap();
            }
        };
        let reader = async {
            let mut seen = Vec::new();
            for _ in 0..5 {
                seen.push(get_movie(&db, movie.id, 100).await.unwrap());
            }
            seen
        };
        let ((), details) = tokio::join!(writer, reader);

        for detail in details {
            assert_eq!(detail.sentiment.total_reviews as usize, detail.reviews.len());
        }
    }

    #[tokio::test]
    async fn detail_for_unknown_movie_is_not_found() {
        let db = test_db().await;
        let err = get_movie(&db, 404, 10).await.unwrap_err();
        assert!(matches!(err, Error::MovieNotFound(404)));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let db = test_db().await;
        insert_test_movie(&db, 1, "Pushpa 2: The Rule", Some("2024-12-05")).await;
        insert_test_movie(&db, 2, "Salaar: Part 1", Some("2024-11-28")).await;
        insert_test_movie(&db, 3, "Devara Part 1", Some("2024-11-15")).await;

        let hits = search_movies(&db, "  PART ", 10).await.unwrap();
        assert_eq!(titles(&hits), vec!["Salaar: Part 1", "Devara Part 1"]);

        let none = search_movies(&db, "kgf", 10).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn blank_search_returns_everything() {
        let db = test_db().await;
        insert_test_movie(&db, 1, "Jawan", Some("2024-10-20")).await;
        insert_test_movie(&db, 2, "Tiger 3", Some("2024-11-01")).await;

        let all = search_movies(&db, "   ", 10).await.unwrap();
        assert_eq!(titles(&all), vec!["Tiger 3", "Jawan"]);
    }
}
