use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::token::verify_token;
use crate::db::users;
use crate::error::AppError;
use crate::extractors::{CurrentUser, LoadedPost, Profile};
use crate::state::AppState;

const NOT_AUTHORIZED: &str = "User is not authorized";

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Requires a valid bearer token for a user that still exists. On success the
/// caller's identity is attached as [`CurrentUser`].
pub async fn require_signin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("No authorization token was found".into()))?;

    let claims = verify_token(&state.config.auth, token).map_err(|e| {
        tracing::warn!("Rejected bearer token: {}", e);
        AppError::Unauthorized("Invalid token".into())
    })?;

    let known = {
        let conn = state.db.get()?;
        users::exists(&conn, &claims.sub)?
    };
    if !known {
        tracing::warn!(user_id = %claims.sub, "Bearer token for unknown user");
        return Err(AppError::Unauthorized("Invalid token".into()));
    }

    req.extensions_mut().insert(CurrentUser { id: claims.sub });
    Ok(next.run(req).await)
}

/// The signed-in user must be the user named by `{userId}`.
pub async fn has_authorization(req: Request, next: Next) -> Result<Response, AppError> {
    let caller = req.extensions().get::<CurrentUser>();
    let profile = req.extensions().get::<Profile>();
    let allowed = matches!((caller, profile), (Some(caller), Some(Profile(user))) if caller.id == user.id);
    if !allowed {
        return Err(AppError::Forbidden(NOT_AUTHORIZED.into()));
    }
    Ok(next.run(req).await)
}

/// The signed-in user must own the post named by `{postId}`.
pub async fn is_poster(req: Request, next: Next) -> Result<Response, AppError> {
    let caller = req.extensions().get::<CurrentUser>();
    let post = req.extensions().get::<LoadedPost>();
    let allowed = matches!((caller, post), (Some(caller), Some(LoadedPost(post))) if caller.id == post.user);
    if !allowed {
        return Err(AppError::Forbidden(NOT_AUTHORIZED.into()));
    }
    Ok(next.run(req).await)
}
