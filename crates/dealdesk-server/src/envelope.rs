//! Response envelope and error mapping.
//!
//! Success bodies are `{ok: true, ...}`; failures are
//! `{error: {message, details?}, timestamp}` with the status derived
//! from the engine error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use dealdesk_core::{DealdeskError, ErrorKind};

/// Build a success envelope around a serializable payload.
pub fn ok(data: impl Serialize) -> Json<Value> {
    let mut body = json!({ "ok": true });
    if let Value::Object(ref mut map) = body {
        match serde_json::to_value(data) {
            Ok(Value::Object(fields)) => {
                for (k, v) in fields {
                    map.insert(k, v);
                }
            }
            Ok(other) => {
                map.insert("data".to_string(), other);
            }
            Err(_) => {}
        }
    }
    Json(body)
}

/// API-level error: engine errors plus the authentication failures that
/// never reach the engine.
#[derive(Debug)]
pub enum ApiError {
    Engine(DealdeskError),
    Unauthorized(String),
}

impl From<DealdeskError> for ApiError {
    fn from(e: DealdeskError) -> Self {
        Self::Engine(e)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::ConfigMissing => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StateMismatch | ErrorKind::InvariantViolation => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, message.clone(), None)
            }
            Self::Engine(e) => {
                let status = status_for(e.kind());
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("internal error: {e}");
                }
                let details = e
                    .field_details()
                    .map(|d| serde_json::to_value(d).unwrap_or(Value::Null));
                (status, e.to_string(), details)
            }
        };

        let mut error = json!({ "message": message });
        if let Some(details) = details {
            error["details"] = details;
        }
        let body = json!({
            "error": error,
            "timestamp": Utc::now().to_rfc3339(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealdesk_core::FieldError;

    #[test]
    fn test_ok_merges_object_fields() {
        let body = ok(json!({ "plan": { "id": 1 }, "escalated": true })).0;
        assert_eq!(body["ok"], true);
        assert_eq!(body["escalated"], true);
        assert_eq!(body["plan"]["id"], 1);
    }

    #[test]
    fn test_ok_wraps_non_object() {
        let body = ok(json!([1, 2, 3])).0;
        assert_eq!(body["ok"], true);
        assert_eq!(body["data"], json!([1, 2, 3]));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(DealdeskError::invalid_field("x", "y").kind()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(DealdeskError::state_mismatch("x").kind()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(DealdeskError::invariant("x").kind()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(DealdeskError::forbidden("x").kind()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(DealdeskError::not_found("x").kind()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(DealdeskError::config_missing("x").kind()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_field_details_serialize() {
        let err =
            DealdeskError::invalid_input(vec![FieldError::new("inputs.handoverYear", "bad")]);
        let details = err.field_details().unwrap();
        let value = serde_json::to_value(details).unwrap();
        assert_eq!(value[0]["field"], "inputs.handoverYear");
    }
}
