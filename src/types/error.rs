//! Error types for master-match
//!
//! One enum covers every component boundary. The HTTP layer maps each kind to
//! a status code; the services never see hyper types.

use hyper::StatusCode;

/// Main error type for master-match operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed or out-of-range input, rejected at the boundary
    #[error("Validation error: {0}")]
    Validation(String),

    /// Possession-token mismatch or a bad webhook signature
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The verification vendor answered with an error status or did not answer
    #[error("Upstream integration error (status {status:?}): {body}")]
    Upstream { status: Option<u16>, body: String },

    /// A vendor event this core does not act on
    #[error("Unrecognized event: {0}")]
    UnrecognizedEvent(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Build an upstream error from a vendor response
    pub fn upstream(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Convert error to HTTP status code
    ///
    /// Unrecognized events are acknowledged with 200 so the vendor does not
    /// keep redelivering them.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::UnrecognizedEvent(_) => StatusCode::OK,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable kind used in JSON error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::Upstream { .. } => "upstream",
            Self::UnrecognizedEvent(_) => "unrecognized_event",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// JSON body for an error response
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Upstream { status, body } => {
                // Pass the vendor's own payload through when it is JSON
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .unwrap_or_else(|_| serde_json::Value::String(body.clone()));
                serde_json::json!({
                    "error": self.kind(),
                    "status": status,
                    "sumsub": detail,
                })
            }
            _ => serde_json::json!({
                "error": self.kind(),
                "message": self.to_string(),
            }),
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for GatewayError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for GatewayError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let body = if err.is_timeout() {
            format!("vendor request timed out: {}", err)
        } else {
            format!("vendor request failed: {}", err)
        };
        Self::Upstream { status, body }
    }
}

/// Result type alias for master-match operations
pub type Result<T> = std::result::Result<T, GatewayError>;
