//! Success envelope and request-body decoding shared by all handlers.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;

/// `{ "success": true, "message"?: ..., "data": ... }`
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: Option<String>,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: None,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: None,
            data,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data = match serde_json::to_value(&self.data) {
            Ok(v) => v,
            Err(e) => return AppError::from(e).into_response(),
        };
        let mut body = json!({ "success": true, "data": data });
        if let (Some(message), Value::Object(map)) = (self.message, &mut body) {
            map.insert("message".to_string(), Value::String(message));
        }
        (self.status, Json(body)).into_response()
    }
}

/// JSON body extractor whose rejections use the error envelope.
/// Malformed JSON, missing required fields and unknown fields all become 400.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Request body is required".to_string()));
        }
        serde_json::from_slice(&bytes)
            .map(ValidJson)
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

/// `Path` extractor whose rejections (e.g. a malformed UUID) use the error envelope.
#[derive(Debug)]
pub struct PathParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| PathParams(value))
            .map_err(|e| AppError::Validation(e.body_text()))
    }
}

/// Decodes an already-parsed JSON value into a typed request record.
pub fn decode_body<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        #[allow(dead_code)]
        name: String,
    }

    #[tokio::test]
    async fn test_created_envelope_carries_message() {
        let response = ApiResponse::created(json!({"id": 1}))
            .with_message("Created")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Created");
        assert_eq!(body["data"]["id"], 1);
    }

    #[test]
    fn test_decode_body_rejects_unknown_fields() {
        let err = decode_body::<Sample>(json!({"name": "a", "extra": 1})).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("extra")));
    }

    #[test]
    fn test_decode_body_reports_missing_field() {
        let err = decode_body::<Sample>(json!({})).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("name")));
    }
}
