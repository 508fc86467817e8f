//! Typed path extractor for entity IDs.
//!
//! `PathId<BoardId>` pulls the single `:id` segment out of the path and
//! wraps it in the right newtype. A segment that is not a UUID becomes a
//! 400 naming the entity, instead of axum's plain-text rejection.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use kanban_core::EntityIdType;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
pub struct PathId<T: EntityIdType>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: EntityIdType,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                ApiError::invalid_format(T::ENTITY_NAME, &format!("single path id: {}", e))
            })?;

        let uuid = Uuid::parse_str(&raw).map_err(|_| {
            ApiError::invalid_format(&format!("{} id", T::ENTITY_NAME), "valid UUID")
                .with_details(serde_json::json!({ "path_param": raw }))
        })?;

        Ok(PathId(T::new(uuid)))
    }
}
