use axum::extract::{Multipart, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::models::{User, UserFields, UserSummary};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{JsonBody, Profile};
use crate::media;
use crate::routes::table::{Guard, RouteTable};
use crate::state::AppState;

const USER: &str = "/api/users/{userId}";

/// Body of follow/unfollow: the acting user's id.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FollowBody {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

pub fn bind(table: &mut RouteTable) {
    use Guard::{HasAuthorization, RequireSignin};

    table
        .get("/api/users", &[], list)
        .post("/api/users", &[], create);

    table
        .get(USER, &[RequireSignin], read)
        .put(USER, &[RequireSignin, HasAuthorization], update)
        .delete(USER, &[RequireSignin, HasAuthorization], remove);

    // Rebinding the same paths without guards replaces the set above.
    table
        .get(USER, &[], read)
        .put(USER, &[], update)
        .delete(USER, &[], remove);

    table
        .put("/api/users/follow/{userId}", &[RequireSignin], follow)
        .put("/api/users/unfollow/{userId}", &[RequireSignin], unfollow)
        .put(
            "/api/users/update/{userId}",
            &[RequireSignin, HasAuthorization],
            update_profile,
        );
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<UserFields>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    users::insert(&conn, &fields, state.config.auth.bcrypt_cost)?;
    Ok(Json(json!({ "message": "Successfully signed up!" })))
}

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<UserSummary>>> {
    let conn = state.db.get()?;
    Ok(Json(users::list(&conn)?))
}

pub async fn read(Profile(user): Profile) -> Json<User> {
    Json(user)
}

pub async fn update(
    State(state): State<AppState>,
    Profile(user): Profile,
    JsonBody(fields): JsonBody<UserFields>,
) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    let updated = users::update(&conn, &user, &fields, state.config.auth.bcrypt_cost)?;
    Ok(Json(updated))
}

pub async fn remove(State(state): State<AppState>, Profile(user): Profile) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    users::delete(&conn, &user.id)?;
    tracing::info!(user_id = %user.id, "User deleted");
    Ok(Json(user))
}

enum FollowChange {
    Follow,
    Unfollow,
}

// Two separate writes with no transaction around them; a failure after the
// first leaves the pair half-updated.
fn apply_follow_change(
    state: &AppState,
    follower_id: Option<&str>,
    target_id: &str,
    change: FollowChange,
) -> AppResult<()> {
    let follower_id = follower_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("userId is required".into()))?;
    Uuid::parse_str(follower_id)
        .map_err(|_| AppError::BadRequest(format!("Malformed userId {}", follower_id)))?;
    let conn = state.db.get()?;
    match change {
        FollowChange::Follow => {
            users::push_following(&conn, follower_id, target_id)?;
            users::push_follower(&conn, target_id, follower_id)?;
        }
        FollowChange::Unfollow => {
            users::pull_following(&conn, follower_id, target_id)?;
            users::pull_follower(&conn, target_id, follower_id)?;
        }
    }
    Ok(())
}

pub async fn follow(
    State(state): State<AppState>,
    Profile(target): Profile,
    JsonBody(body): JsonBody<FollowBody>,
) -> AppResult<Json<Value>> {
    apply_follow_change(&state, body.user_id.as_deref(), &target.id, FollowChange::Follow).map_err(
        |e| {
            tracing::warn!(target_id = %target.id, "Follow failed: {}", e);
            AppError::BadRequest("Could not follow user".into())
        },
    )?;
    Ok(Json(json!({ "message": "User followed successfully" })))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Profile(target): Profile,
    JsonBody(body): JsonBody<FollowBody>,
) -> AppResult<Json<Value>> {
    apply_follow_change(&state, body.user_id.as_deref(), &target.id, FollowChange::Unfollow)
        .map_err(|e| {
            tracing::warn!(target_id = %target.id, "Unfollow failed: {}", e);
            AppError::BadRequest("Could not unfollow user".into())
        })?;
    Ok(Json(json!({ "message": "User unfollowed successfully" })))
}

/// Multipart profile edit: text fields plus an optional `profilePic` file.
/// The picture is written only once the whole form has been read, and is
/// removed again if the update is rejected.
pub async fn update_profile(
    State(state): State<AppState>,
    Profile(user): Profile,
    mut multipart: Multipart,
) -> AppResult<Json<User>> {
    let mut fields = UserFields::default();
    let mut picture = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "profilePic" => {
                let file_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if !data.is_empty() {
                    picture = Some((file_name, data));
                }
            }
            "username" | "name" | "email" | "bio" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                match name.as_str() {
                    "username" => fields.username = Some(value),
                    "name" => fields.name = Some(value),
                    "email" => fields.email = Some(value),
                    _ => fields.bio = Some(value),
                }
            }
            other => tracing::debug!(field = other, "Ignoring profile form field"),
        }
    }

    let uploads = state.config.uploads_path();
    if let Some((file_name, data)) = &picture {
        fields.profile_pic = Some(media::store(&uploads, file_name.as_deref(), data).await?);
    }

    let result = {
        let conn = state.db.get()?;
        users::update(&conn, &user, &fields, state.config.auth.bcrypt_cost)
    };
    match result {
        Ok(updated) => Ok(Json(updated)),
        Err(e) => {
            if let Some(url) = &fields.profile_pic {
                media::discard(&uploads, url).await;
            }
            Err(e)
        }
    }
}
