//! Error response rendering.
//!
//! Every gateway-originated failure becomes a JSON body with a stable
//! machine-readable `code`, so callers can branch on it without parsing the
//! human-readable message. Downstream responses never pass through here;
//! they are forwarded verbatim.

use axum::http::header::RETRY_AFTER;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::GatewayError;

/// Wire shape of a gateway error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,

    #[serde(rename = "retryAfterSeconds", skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,

    #[serde(rename = "circuitState", skip_serializing_if = "Option::is_none")]
    pub circuit_state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl ErrorBody {
    pub fn from_error(err: &GatewayError) -> Self {
        let mut body = Self {
            code: err.code(),
            message: err.to_string(),
            retry_after_seconds: None,
            circuit_state: None,
            service: None,
        };
        match err {
            GatewayError::RateLimited { retry_after_secs } => {
                body.retry_after_seconds = Some(*retry_after_secs);
            }
            GatewayError::CircuitOpen { service, state } => {
                body.circuit_state = Some(state.to_string());
                body.service = Some(service.clone());
            }
            GatewayError::Unreachable { service, .. } | GatewayError::Timeout { service } => {
                body.service = Some(service.clone());
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody::from_error(&self);
        let mut response = (status, Json(body)).into_response();

        if let GatewayError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}
