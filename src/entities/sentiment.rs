use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sentiment label attached to a review, a classification verdict or a
/// movie aggregate.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Deserialize, Serialize, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    #[sea_orm(string_value = "positive")]
    Positive,
    #[sea_orm(string_value = "negative")]
    Negative,
    #[sea_orm(string_value = "neutral")]
    Neutral,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Score stored for a review whose source only supplies a label.
    pub fn fallback_score(self) -> f64 {
        match self {
            Sentiment::Positive => 0.8,
            Sentiment::Negative => 0.3,
            Sentiment::Neutral => 0.5,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
