use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("rate limit exceeded, please try again later")]
    RateLimited,

    #[error("classification credits exhausted")]
    QuotaExhausted,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("invalid response shape: {0}")]
    InvalidResponseShape(String),

    #[error("movie {0} not found")]
    MovieNotFound(i32),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::MovieNotFound(_) => StatusCode::NOT_FOUND,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::QuotaExhausted => StatusCode::PAYMENT_REQUIRED,
            Error::UpstreamUnavailable(_)
            | Error::Upstream { .. }
            | Error::InvalidResponseShape(_) => StatusCode::BAD_GATEWAY,
            Error::Configuration(_) | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sea_orm::TransactionError<Error>> for Error {
    fn from(err: sea_orm::TransactionError<Error>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(e) => Error::Database(e),
            sea_orm::TransactionError::Transaction(e) => e,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let message = match self {
            Error::Database(_) => "internal database error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kinds_map_to_distinct_statuses() {
        assert_eq!(Error::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(Error::QuotaExhausted.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(Error::MovieNotFound(7).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Validation("empty".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::InvalidResponseShape("no tool call".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::Configuration("missing key".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn database_errors_keep_sql_out_of_the_body() {
        let err = Error::Database(sea_orm::DbErr::Custom(
            "no such column: movies.secret_col".to_string(),
        ));

        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal database error");
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let resp = Error::MovieNotFound(5).into_response();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "movie 5 not found");
    }

    #[test]
    fn transaction_errors_unwrap_to_inner_kind() {
        let err: Error = sea_orm::TransactionError::Transaction(Error::MovieNotFound(3)).into();
        assert!(matches!(err, Error::MovieNotFound(3)));
    }
}
