use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{CommentId, Post, PostFields};
use crate::db::users::ids;
use crate::db::{new_id, touch};
use crate::error::{AppError, AppResult};

const POST_COLUMNS: &str = "id, content, photo, user_id, created_at, updated_at";

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        content: row.get(1)?,
        photo: row.get(2)?,
        user: row.get(3)?,
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn validate(content: &str, photo: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Content is required".into()));
    }
    if photo.trim().is_empty() {
        return Err(AppError::Validation("Photo is required".into()));
    }
    Ok(())
}

pub fn likes(conn: &Connection, post_id: &str) -> rusqlite::Result<Vec<String>> {
    ids(
        conn,
        "SELECT user_id FROM post_likes WHERE post_id = ?1 ORDER BY rowid",
        post_id,
    )
}

pub fn comments(conn: &Connection, post_id: &str) -> rusqlite::Result<Vec<CommentId>> {
    ids(
        conn,
        "SELECT comment_id FROM post_comments WHERE post_id = ?1 ORDER BY rowid",
        post_id,
    )
}

fn with_relations(conn: &Connection, mut post: Post) -> rusqlite::Result<Post> {
    post.likes = likes(conn, &post.id)?;
    post.comments = comments(conn, &post.id)?;
    Ok(post)
}

fn query_posts(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> rusqlite::Result<Vec<Post>> {
    let mut stmt = conn.prepare(sql)?;
    let posts = stmt
        .query_map(args, post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    posts
        .into_iter()
        .map(|post| with_relations(conn, post))
        .collect()
}

/// The owner reference is checked by the store's foreign key only.
pub fn insert(conn: &Connection, owner_id: &str, fields: &PostFields) -> AppResult<Post> {
    let content = fields.content.clone().unwrap_or_default();
    let photo = fields.photo.clone().unwrap_or_default();
    validate(&content, &photo)?;

    let now = Utc::now();
    let post = Post {
        id: new_id(),
        content,
        photo,
        user: owner_id.to_string(),
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO posts (id, content, photo, user_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            post.id,
            post.content,
            post.photo,
            post.user,
            post.created_at,
            post.updated_at
        ],
    )?;

    Ok(post)
}

/// Newest first.
pub fn list(conn: &Connection) -> rusqlite::Result<Vec<Post>> {
    query_posts(
        conn,
        &format!("SELECT {POST_COLUMNS} FROM posts ORDER BY rowid DESC"),
        &[],
    )
}

pub fn list_by_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<Post>> {
    query_posts(
        conn,
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE user_id = ?1 ORDER BY rowid DESC"),
        &[&user_id],
    )
}

pub fn find(conn: &Connection, id: &str) -> rusqlite::Result<Option<Post>> {
    let post = conn
        .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            params![id],
            post_from_row,
        )
        .optional()?;

    post.map(|post| with_relations(conn, post)).transpose()
}

pub fn update(conn: &Connection, current: &Post, fields: &PostFields) -> AppResult<Post> {
    let mut post = current.clone();
    if let Some(content) = &fields.content {
        post.content = content.clone();
    }
    if let Some(photo) = &fields.photo {
        post.photo = photo.clone();
    }
    validate(&post.content, &post.photo)?;
    post.updated_at = touch(current.updated_at);

    let rows = conn.execute(
        "UPDATE posts SET content = ?2, photo = ?3, updated_at = ?4 WHERE id = ?1",
        params![post.id, post.content, post.photo, post.updated_at],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("No document found for post {}", post.id)));
    }

    Ok(with_relations(conn, post)?)
}

pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("No document found for post {}", id)));
    }
    Ok(())
}

pub fn like(conn: &Connection, post_id: &str, user_id: &str) -> rusqlite::Result<Vec<String>> {
    conn.execute(
        "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
        params![post_id, user_id],
    )?;
    likes(conn, post_id)
}

pub fn unlike(conn: &Connection, post_id: &str, user_id: &str) -> rusqlite::Result<Vec<String>> {
    conn.execute(
        "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, user_id],
    )?;
    likes(conn, post_id)
}

pub fn push_comment(conn: &Connection, post_id: &str, comment_id: &str) -> rusqlite::Result<Vec<CommentId>> {
    conn.execute(
        "INSERT INTO post_comments (post_id, comment_id) VALUES (?1, ?2)",
        params![post_id, comment_id],
    )?;
    comments(conn, post_id)
}

/// Removes every occurrence of the comment id.
pub fn pull_comment(conn: &Connection, post_id: &str, comment_id: &str) -> rusqlite::Result<Vec<CommentId>> {
    conn.execute(
        "DELETE FROM post_comments WHERE post_id = ?1 AND comment_id = ?2",
        params![post_id, comment_id],
    )?;
    comments(conn, post_id)
}
