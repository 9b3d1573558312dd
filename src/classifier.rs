//! Remote text classification.
//!
//! The rest of the crate only sees the two narrow traits below; the concrete
//! [`AiGatewayClient`] talks to an OpenAI-compatible chat completions endpoint
//! and forces a function call so that the reply has a fixed schema.

use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    entities::{Sentiment, movie},
    error::{AppResult, Error},
    models::{ClassificationResult, SourcedReview},
};

const ANALYZE_TOOL: &str = "analyze_sentiment";
const GENERATE_TOOL: &str = "generate_reviews";
const MAX_SUMMARY_WORDS: usize = 150;

/// Batch classification: many review texts in, one combined verdict out.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, reviews: &[String]) -> AppResult<ClassificationResult>;
}

/// Produces labelled reviews for one movie.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_reviews(&self, movie: &movie::Model) -> AppResult<Vec<SourcedReview>>;

    /// Tag stored on every review row coming from this source.
    fn source_tag(&self) -> &str;
}

pub struct AiGatewayClient {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
    model: String,
    reviews_per_movie: usize,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl AiGatewayClient {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        url: String,
        model: String,
        reviews_per_movie: usize,
        rps: u32,
    ) -> Self {
        if api_key.is_none() {
            warn!("AI_GATEWAY_API_KEY not set, classification requests will fail");
        }

        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));
        Self {
            client,
            api_key,
            url,
            model,
            reviews_per_movie: reviews_per_movie.max(1),
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Sends one chat completion with a forced tool call and returns the raw
    /// JSON arguments of that call.
    async fn call_tool(&self, messages: Value, tool: Value, tool_name: &str) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("AI_GATEWAY_API_KEY is not set".to_string()))?;

        self.limiter.until_ready().await;

        let body = json!({
            "model": self.model,
            "messages": messages,
            "tools": [tool],
            "tool_choice": { "type": "function", "function": { "name": tool_name } },
        });

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "AI gateway error");
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => Error::RateLimited,
                StatusCode::PAYMENT_REQUIRED => Error::QuotaExhausted,
                _ => Error::Upstream {
                    status: status.as_u16(),
                    message: text.chars().take(200).collect(),
                },
            });
        }

        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| Error::InvalidResponseShape(format!("undecodable body: {e}")))?;

        let call = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.tool_calls)
            .and_then(|calls| calls.into_iter().next())
            .ok_or_else(|| Error::InvalidResponseShape("no tool call in response".to_string()))?;

        if call.function.name != tool_name {
            return Err(Error::InvalidResponseShape(format!(
                "expected tool {tool_name}, got {}",
                call.function.name
            )));
        }

        Ok(call.function.arguments)
    }
}

#[async_trait]
impl SentimentClassifier for AiGatewayClient {
    async fn classify(&self, reviews: &[String]) -> AppResult<ClassificationResult> {
        if reviews.is_empty() || reviews.iter().any(|r| r.trim().is_empty()) {
            return Err(Error::Validation("reviews must be non-empty and non-blank".to_string()));
        }

        debug!(count = reviews.len(), "classifying review batch");

        let reviews_text = reviews
            .iter()
            .enumerate()
            .map(|(i, r)| format!("Review {}: {}", i + 1, r.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");

        let messages = json!([
            { "role": "system", "content": ANALYZE_PROMPT },
            {
                "role": "user",
                "content": format!(
                    "Analyze these movie reviews and provide overall sentiment:\n\n{reviews_text}"
                ),
            },
        ]);

        let arguments = self.call_tool(messages, analyze_tool(), ANALYZE_TOOL).await?;
        parse_verdict(&arguments)
    }
}

#[async_trait]
impl ReviewSource for AiGatewayClient {
    async fn fetch_reviews(&self, movie: &movie::Model) -> AppResult<Vec<SourcedReview>> {
        debug!(movie_id = movie.id, title = %movie.title, "generating sample reviews");

        let messages = json!([
            {
                "role": "system",
                "content": "You are generating realistic movie reviews in the style of Indian \
                            cinema fans. Generate diverse opinions.",
            },
            {
                "role": "user",
                "content": format!(
                    "Generate {} realistic movie reviews for \"{}\". Include a mix of positive, \
                     negative, and neutral reviews.",
                    self.reviews_per_movie, movie.title
                ),
            },
        ]);

        let arguments = self.call_tool(messages, generate_tool(), GENERATE_TOOL).await?;
        let generated: GeneratedReviews = serde_json::from_str(&arguments)
            .map_err(|e| Error::InvalidResponseShape(format!("generated reviews: {e}")))?;
        Ok(generated
            .reviews
            .into_iter()
            .map(|r| SourcedReview::labelled(r.text, r.sentiment))
            .collect())
    }

    fn source_tag(&self) -> &str {
        "bookmyshow"
    }
}

fn parse_verdict(arguments: &str) -> AppResult<ClassificationResult> {
    let raw: RawVerdict = serde_json::from_str(arguments)
        .map_err(|e| Error::InvalidResponseShape(format!("verdict arguments: {e}")))?;

    let score = raw.score.round();
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(Error::InvalidResponseShape(format!("score {} out of range", raw.score)));
    }

    let summary = raw.summary.trim().to_string();
    let words = summary.split_whitespace().count();
    if words == 0 || words > MAX_SUMMARY_WORDS {
        return Err(Error::InvalidResponseShape(format!("summary has {words} words")));
    }

    Ok(ClassificationResult { sentiment: raw.sentiment, score: score as u8, summary })
}

const ANALYZE_PROMPT: &str = "You are a sentiment analysis expert for Indian cinema movie \
reviews. Analyze reviews and determine overall sentiment as: positive, negative, or neutral.\n\n\
Guidelines:\n\
- Positive: Reviews praising acting, story, direction, music, entertainment value\n\
- Negative: Reviews criticizing poor execution, weak story, bad acting, waste of time/money\n\
- Neutral: Mixed reviews, moderate opinions, or balanced criticism and praise\n\n\
Return the overall sentiment and a confidence score (0-100) based on review consensus.";

fn analyze_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": ANALYZE_TOOL,
            "description": "Analyze movie reviews and return sentiment classification",
            "parameters": {
                "type": "object",
                "properties": {
                    "sentiment": {
                        "type": "string",
                        "enum": ["positive", "negative", "neutral"],
                        "description": "Overall sentiment classification",
                    },
                    "score": { "type": "number", "description": "Confidence score from 0-100" },
                    "summary": {
                        "type": "string",
                        "description": "Brief summary of why this sentiment was determined \
                                        (max 100 words)",
                    },
                },
                "required": ["sentiment", "score", "summary"],
                "additionalProperties": false,
            },
        },
    })
}

fn generate_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": GENERATE_TOOL,
            "description": "Generate movie reviews",
            "parameters": {
                "type": "object",
                "properties": {
                    "reviews": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "text": { "type": "string" },
                                "sentiment": {
                                    "type": "string",
                                    "enum": ["positive", "negative", "neutral"],
                                },
                            },
                            "required": ["text", "sentiment"],
                        },
                    },
                },
                "required": ["reviews"],
            },
        },
    })
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    sentiment: Sentiment,
    score: f64,
    summary: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedReviews {
    reviews: Vec<GeneratedReview>,
}

/// Only the label is taken from the model. Extra fields such as a score are
/// ignored.
#[derive(Debug, Deserialize)]
struct GeneratedReview {
    text: String,
    sentiment: Sentiment,
}
