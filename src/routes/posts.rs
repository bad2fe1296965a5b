use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::{Post, PostFields};
use crate::db::posts;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, JsonBody, LoadedPost, Profile};
use crate::routes::table::{Guard, RouteTable};
use crate::state::AppState;

const POST: &str = "/api/posts/{postId}";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentBody {
    #[serde(rename = "commentId")]
    pub comment_id: Option<String>,
}

pub fn bind(table: &mut RouteTable) {
    use Guard::{IsPoster, RequireSignin};

    table
        .get("/api/posts", &[], list)
        .post("/api/posts", &[RequireSignin], create)
        .get("/api/posts/by/{userId}", &[], list_by_user)
        .get(POST, &[], read)
        .put(POST, &[RequireSignin, IsPoster], update)
        .delete(POST, &[RequireSignin, IsPoster], remove)
        .put("/api/posts/{postId}/like", &[RequireSignin], like)
        .put("/api/posts/{postId}/unlike", &[RequireSignin], unlike)
        .put("/api/posts/{postId}/comment", &[RequireSignin], comment)
        .put("/api/posts/{postId}/uncomment", &[RequireSignin], uncomment);
}

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::list(&conn)?))
}

pub async fn list_by_user(
    State(state): State<AppState>,
    Profile(user): Profile,
) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::list_by_user(&conn, &user.id)?))
}

pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(fields): JsonBody<PostFields>,
) -> AppResult<Json<Post>> {
    let conn = state.db.get()?;
    let post = posts::insert(&conn, &caller.id, &fields)?;
    tracing::info!(post_id = %post.id, user_id = %caller.id, "Post created");
    Ok(Json(post))
}

pub async fn read(LoadedPost(post): LoadedPost) -> Json<Post> {
    Json(post)
}

pub async fn update(
    State(state): State<AppState>,
    LoadedPost(post): LoadedPost,
    JsonBody(fields): JsonBody<PostFields>,
) -> AppResult<Json<Post>> {
    let conn = state.db.get()?;
    Ok(Json(posts::update(&conn, &post, &fields)?))
}

pub async fn remove(State(state): State<AppState>, LoadedPost(post): LoadedPost) -> AppResult<Json<Post>> {
    let conn = state.db.get()?;
    posts::delete(&conn, &post.id)?;
    Ok(Json(post))
}

pub async fn like(
    State(state): State<AppState>,
    caller: CurrentUser,
    LoadedPost(post): LoadedPost,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let likes = posts::like(&conn, &post.id, &caller.id)?;
    Ok(Json(json!({ "likes": likes })))
}

pub async fn unlike(
    State(state): State<AppState>,
    caller: CurrentUser,
    LoadedPost(post): LoadedPost,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let likes = posts::unlike(&conn, &post.id, &caller.id)?;
    Ok(Json(json!({ "likes": likes })))
}

fn comment_id(body: CommentBody) -> AppResult<String> {
    body.comment_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("commentId is required".into()))
}

pub async fn comment(
    State(state): State<AppState>,
    LoadedPost(post): LoadedPost,
    JsonBody(body): JsonBody<CommentBody>,
) -> AppResult<Json<Value>> {
    let comment_id = comment_id(body)?;
    let conn = state.db.get()?;
    let comments = posts::push_comment(&conn, &post.id, &comment_id)?;
    Ok(Json(json!({ "comments": comments })))
}

pub async fn uncomment(
    State(state): State<AppState>,
    LoadedPost(post): LoadedPost,
    JsonBody(body): JsonBody<CommentBody>,
) -> AppResult<Json<Value>> {
    let comment_id = comment_id(body)?;
    let conn = state.db.get()?;
    let comments = posts::pull_comment(&conn, &post.id, &comment_id)?;
    Ok(Json(json!({ "comments": comments })))
}
