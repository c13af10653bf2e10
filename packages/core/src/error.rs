use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified application error.
///
/// Every layer (config, storage, hosting API, request validation) fails
/// through this type so the HTTP surface can map each kind to a stable
/// machine-checkable code plus a human-readable message.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required setting is missing or malformed.
    #[error("{0}")]
    Config(String),

    /// The expected tables are absent; the operator has to run migrations.
    #[error("Database not initialized: {0}")]
    NotInitialized(String),

    /// The hosting API answered with a non-2xx status.
    #[error("Hosting API error: HTTP {status}")]
    Upstream { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    /// Stable identifier carried in the `error` field of every failure body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "not_configured",
            AppError::NotInitialized(_) => "not_initialized",
            AppError::Upstream { .. } => "upstream_error",
            AppError::Network(_) => "network_error",
            AppError::Parse(_) => "parse_error",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Database(_) => "database_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotInitialized(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { .. } | AppError::Network(_) | AppError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if is_missing_table(&err) {
            return AppError::NotInitialized(
                "run the migrations (start the server without --skip-migrations)".to_string(),
            );
        }
        AppError::Database(err.to_string())
    }
}

/// True when SQLite rejected a statement because a table does not exist.
pub fn is_missing_table(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("no such table"),
        _ => false,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} ({})", self, self.code());
        } else {
            tracing::warn!("{} ({})", self, self.code());
        }

        let body = json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_validation_map_to_400() {
        assert_eq!(
            AppError::Config("Database not configured".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Validation("Site ID is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn upstream_message_includes_status() {
        let err = AppError::Upstream { status: 401 };
        assert_eq!(err.to_string(), "Hosting API error: HTTP 401");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn each_kind_has_a_distinct_code() {
        let codes = [
            AppError::Config(String::new()).code(),
            AppError::NotInitialized(String::new()).code(),
            AppError::Upstream { status: 500 }.code(),
            AppError::Network(String::new()).code(),
            AppError::Parse(String::new()).code(),
            AppError::Validation(String::new()).code(),
            AppError::NotFound(String::new()).code(),
            AppError::Database(String::new()).code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
