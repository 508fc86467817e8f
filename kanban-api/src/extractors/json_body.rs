//! JSON body extractor with API error rejections.
//!
//! axum's `Json` rejects with plain text and splits failures across 400,
//! 415 and 422. `JsonBody<T>` folds every body failure into a
//! `MALFORMED_REQUEST` 400 so 422 stays reserved for invalid positions.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(malformed(rejection)),
        }
    }
}

fn malformed(rejection: JsonRejection) -> ApiError {
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected request with `Content-Type: application/json`".to_string()
        }
        other => other.body_text(),
    };
    ApiError::malformed(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::{header, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Named {
        name: String,
    }

    async fn echo(JsonBody(body): JsonBody<Named>) -> String {
        body.name
    }

    async fn send(body: &'static str, content_type: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let response = Router::new()
            .route("/", post(echo))
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_valid_body() {
        let (status, body) = send(r#"{"name":"Backlog"}"#, Some("application/json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Backlog");
    }

    #[tokio::test]
    async fn test_missing_field_is_malformed() {
        let (status, body) = send(r#"{"title":"x"}"#, Some("application/json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, ErrorCode::MalformedRequest);
    }

    #[tokio::test]
    async fn test_syntax_error_is_malformed() {
        let (status, _) = send("{not json", Some("application/json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_malformed() {
        let (status, body) = send(r#"{"name":"x"}"#, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ApiError = serde_json::from_slice(&body).unwrap();
        assert!(err.message.contains("Content-Type"));
    }
}
