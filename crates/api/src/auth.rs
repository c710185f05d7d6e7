//! Bearer-token authentication middleware.
//!
//! The `/health` endpoint is exempted; everything under `/api/v1` requires
//! the configured key when one is set.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

/// Configuration for API key authentication.
#[derive(Debug, Clone)]
pub struct ApiKeyConfig {
    key_bytes: Vec<u8>,
}

impl ApiKeyConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key_bytes: key.into().into_bytes(),
        }
    }

    /// Constant-time comparison to prevent timing attacks.
    fn verify(&self, provided: &[u8]) -> bool {
        if self.key_bytes.len() != provided.len() {
            return false;
        }
        let mut result: u8 = 0;
        for (a, b) in self.key_bytes.iter().zip(provided.iter()) {
            result |= a ^ b;
        }
        result == 0
    }
}

#[derive(Debug, serde::Serialize)]
struct AuthError {
    error: String,
    code: &'static str,
}

pub async fn require_api_key(
    State(config): State<ApiKeyConfig>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if config.verify(token.as_bytes()) => next.run(request).await,
        Some(_) => {
            warn!("Rejected request with invalid API key");
            unauthorized("Invalid API key")
        }
        None => unauthorized("Missing Authorization: Bearer header"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthError {
            error: message.to_string(),
            code: "unauthorized",
        }),
    )
        .into_response()
}
