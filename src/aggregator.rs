//! Per-movie sentiment aggregate.
//!
//! The aggregate is always rebuilt from every stored review of the movie
//! instead of being patched with deltas, so it cannot drift from the review
//! rows. Incremental counters are only acceptable together with a periodic
//! reconciliation pass.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};
use tracing::debug;

use crate::{
    entities::{Sentiment, movie_sentiment, review},
    error::AppResult,
    models::SentimentSummary,
};

pub fn summarize(reviews: &[review::Model]) -> SentimentSummary {
    let mut positive = 0;
    let mut negative = 0;
    let mut neutral = 0;
    let mut score_sum = 0.0;

    for r in reviews {
        match r.sentiment {
            Sentiment::Positive => positive += 1,
            Sentiment::Negative => negative += 1,
            Sentiment::Neutral => neutral += 1,
        }
        score_sum += r.score;
    }

    let total = positive + negative + neutral;
    let average_score = if total == 0 { 0.0 } else { score_sum / f64::from(total) };

    SentimentSummary {
        positive_count: positive,
        negative_count: negative,
        neutral_count: neutral,
        total_reviews: total,
        average_score,
        overall_sentiment: overall_label(positive, negative, neutral),
    }
}

/// Label with the strictly highest count. A tie involving neutral goes to
/// neutral; a positive/negative tie goes to positive.
pub fn overall_label(positive: i32, negative: i32, neutral: i32) -> Sentiment {
    let max = positive.max(negative).max(neutral);
    if neutral == max {
        Sentiment::Neutral
    } else if positive == max {
        Sentiment::Positive
    } else {
        Sentiment::Negative
    }
}

/// Replays every stored review of `movie_id` and upserts the aggregate row.
/// Accepts an open transaction so callers can recompute before committing.
pub async fn recompute<C>(conn: &C, movie_id: i32) -> AppResult<movie_sentiment::Model>
where
    C: ConnectionTrait,
{
    let reviews =
        review::Entity::find().filter(review::Column::MovieId.eq(movie_id)).all(conn).await?;
    let summary = summarize(&reviews);

    let model = movie_sentiment::Model {
        movie_id,
        positive_count: summary.positive_count,
        negative_count: summary.negative_count,
        neutral_count: summary.neutral_count,
        total_reviews: summary.total_reviews,
        average_score: summary.average_score,
        overall_sentiment: summary.overall_sentiment,
        updated_at: jiff::Timestamp::now().as_millisecond(),
    };

    let active = movie_sentiment::ActiveModel {
        movie_id: Set(model.movie_id),
        positive_count: Set(model.positive_count),
        negative_count: Set(model.negative_count),
        neutral_count: Set(model.neutral_count),
        total_reviews: Set(model.total_reviews),
        average_score: Set(model.average_score),
        overall_sentiment: Set(model.overall_sentiment),
        updated_at: Set(model.updated_at),
    };

    movie_sentiment::Entity::insert(active)
        .on_conflict(
            OnConflict::column(movie_sentiment::Column::MovieId)
                .update_columns([
                    movie_sentiment::Column::PositiveCount,
                    movie_sentiment::Column::NegativeCount,
                    movie_sentiment::Column::NeutralCount,
                    movie_sentiment::Column::TotalReviews,
                    movie_sentiment::Column::AverageScore,
                    movie_sentiment::Column::OverallSentiment,
                    movie_sentiment::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    debug!(
        movie_id = movie_id,
        total = model.total_reviews,
        overall = %model.overall_sentiment,
        "recomputed movie sentiment"
    );

    Ok(model)
}
