use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::db::models::{Post, User};
use crate::error::AppError;

/// Identity attached by the sign-in guard.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
}

/// User resolved from the `{userId}` path segment.
#[derive(Debug, Clone)]
pub struct Profile(pub User);

/// Post resolved from the `{postId}` path segment.
#[derive(Debug, Clone)]
pub struct LoadedPost(pub Post);

fn from_extensions<T: Clone + Send + Sync + 'static>(parts: &Parts, what: &str) -> Result<T, AppError> {
    parts
        .extensions
        .get::<T>()
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("{} missing from request; route is not wired", what)))
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_extensions(parts, "signed-in user")
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Profile {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_extensions(parts, "user")
    }
}

impl<S: Send + Sync> FromRequestParts<S> for LoadedPost {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_extensions(parts, "post")
    }
}

/// JSON body where an absent or blank body means `T::default()`. Clients
/// send bodiless PUTs, which `axum::Json` would reject.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }
        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
    }
}
