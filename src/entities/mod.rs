pub mod movie;
pub mod movie_sentiment;
pub mod review;
pub mod sentiment;

pub use sentiment::Sentiment;
