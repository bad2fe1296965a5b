use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{password, token};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::JsonBody;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signin", post(signin))
        .route("/auth/signout", get(signout))
}

pub async fn signin(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SigninRequest>,
) -> AppResult<Json<Value>> {
    let credentials = {
        let conn = state.db.get()?;
        users::credentials_by_email(&conn, &body.email)?
    };
    let credentials =
        credentials.ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    if !password::verify_password(&body.password, &credentials.hashed_password) {
        tracing::warn!(user_id = %credentials.id, "Sign-in with wrong password");
        return Err(AppError::Unauthorized(
            "Email and password don't match.".into(),
        ));
    }

    let token = token::issue_token(&state.config.auth, &credentials.id)?;
    tracing::info!(user_id = %credentials.id, "User signed in");

    Ok(Json(json!({
        "token": token,
        "user": {
            "_id": credentials.id,
            "name": credentials.name,
            "email": credentials.email,
        }
    })))
}

/// Tokens are stateless; the client discards its copy.
pub async fn signout() -> Json<Value> {
    Json(json!({ "message": "signed out" }))
}
