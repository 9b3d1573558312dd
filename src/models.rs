use serde::{Deserialize, Serialize};

use crate::entities::{Sentiment, movie, movie_sentiment, review};

/// Verdict returned by a batch classification call. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub sentiment: Sentiment,
    /// Confidence in percent, already rounded.
    pub score: u8,
    pub summary: String,
}

/// A labelled review text ready to be stored. Without a `score` the row gets
/// the fixed score of its label.
#[derive(Clone, Debug, PartialEq)]
pub struct SourcedReview {
    pub text: String,
    pub sentiment: Sentiment,
    pub score: Option<f64>,
}

impl SourcedReview {
    pub fn labelled(text: impl Into<String>, sentiment: Sentiment) -> Self {
        Self { text: text.into(), sentiment, score: None }
    }
}

/// Movie fields after catalog normalization, ready to upsert on `tmdb_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMovie {
    pub tmdb_id: i32,
    pub title: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub release_date: Option<String>,
    pub overview: String,
    pub vote_average: f64,
    pub vote_count: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub positive_count: i32,
    pub negative_count: i32,
    pub neutral_count: i32,
    pub total_reviews: i32,
    pub average_score: f64,
    pub overall_sentiment: Sentiment,
}

/// A movie that has no reviews yet shows up as neutral with nothing counted.
impl Default for SentimentSummary {
    fn default() -> Self {
        Self {
            positive_count: 0,
            negative_count: 0,
            neutral_count: 0,
            total_reviews: 0,
            average_score: 0.0,
            overall_sentiment: Sentiment::Neutral,
        }
    }
}

impl From<movie_sentiment::Model> for SentimentSummary {
    fn from(m: movie_sentiment::Model) -> Self {
        Self {
            positive_count: m.positive_count,
            negative_count: m.negative_count,
            neutral_count: m.neutral_count,
            total_reviews: m.total_reviews,
            average_score: m.average_score,
            overall_sentiment: m.overall_sentiment,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieWithSentiment {
    #[serde(flatten)]
    pub movie: movie::Model,
    pub sentiment: SentimentSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieDetail {
    pub movie: movie::Model,
    pub sentiment: SentimentSummary,
    pub reviews: Vec<review::Model>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub reviews: Vec<review::Model>,
    pub sentiment: movie_sentiment::Model,
}

/// Body of the interactive analyze call: either a list of reviews or one
/// newline separated blob.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub reviews: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
}
