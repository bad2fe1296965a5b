// Path-parameter resolvers. They run ahead of the guards on any route whose
// pattern names `{userId}` or `{postId}` and attach the loaded record.
use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::db::{posts, users};
use crate::error::AppError;
use crate::extractors::{LoadedPost, Profile};
use crate::state::AppState;

pub const USER_PARAM: &str = "userId";
pub const POST_PARAM: &str = "postId";

fn param(params: &HashMap<String, String>, name: &str) -> Result<String, AppError> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("route has no {{{}}} segment", name)))
}

pub async fn resolve_user(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let id = param(&params, USER_PARAM)?;
    let lookup_failed = || AppError::BadRequest("Could not retrieve user".into());

    if Uuid::parse_str(&id).is_err() {
        return Err(lookup_failed());
    }
    let user = {
        let conn = state.db.get().map_err(|e| {
            tracing::error!("Pool error while resolving user: {}", e);
            lookup_failed()
        })?;
        users::find(&conn, &id).map_err(|e| {
            tracing::error!("Database error while resolving user {}: {}", id, e);
            lookup_failed()
        })?
    };

    let user = user.ok_or_else(|| AppError::NotFound("User not found".into()))?;
    req.extensions_mut().insert(Profile(user));
    Ok(next.run(req).await)
}

pub async fn resolve_post(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let id = param(&params, POST_PARAM)?;
    let lookup_failed = || AppError::BadRequest("Could not retrieve post".into());

    if Uuid::parse_str(&id).is_err() {
        return Err(lookup_failed());
    }
    let post = {
        let conn = state.db.get().map_err(|e| {
            tracing::error!("Pool error while resolving post: {}", e);
            lookup_failed()
        })?;
        posts::find(&conn, &id).map_err(|e| {
            tracing::error!("Database error while resolving post {}: {}", id, e);
            lookup_failed()
        })?
    };

    let post = post.ok_or_else(|| AppError::NotFound("Post not found".into()))?;
    req.extensions_mut().insert(LoadedPost(post));
    Ok(next.run(req).await)
}
