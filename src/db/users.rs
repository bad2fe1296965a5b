// User records and their follow lists.
use chrono::Utc;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::OnceLock;

use crate::auth::password::{self, MIN_PASSWORD_LEN};
use crate::db::models::{Credentials, User, UserFields, UserSummary, DEFAULT_PROFILE_PIC};
use crate::db::{new_id, touch};
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str = "id, username, name, email, bio, profile_pic, created, updated";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r".+@.+\..+").expect("email pattern compiles"))
}

fn validate(name: &str, email: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".into()));
    }
    if !email_pattern().is_match(email) {
        return Err(AppError::Validation(
            "Please fill a valid email address".into(),
        ));
    }
    Ok(())
}

/// Returns `(hashed_password, salt)` for a new password.
fn hash_new_password(password: Option<&str>, cost: u32) -> AppResult<(String, String)> {
    let password = password.unwrap_or_default();
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    let salt = password::make_salt();
    let hashed = password::hash_password(password, &salt, cost)?;
    Ok((hashed, salt))
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        bio: row.get(4)?,
        profile_pic: row
            .get::<_, Option<String>>(5)?
            .unwrap_or_else(|| DEFAULT_PROFILE_PIC.to_string()),
        following: Vec::new(),
        followers: Vec::new(),
        created: row.get(6)?,
        updated: row.get(7)?,
    })
}

pub(crate) fn ids(conn: &Connection, sql: &str, owner: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![owner], |row| row.get(0))?;
    rows.collect()
}

fn load_relations(conn: &Connection, user: &mut User) -> rusqlite::Result<()> {
    user.following = ids(
        conn,
        "SELECT target_id FROM user_following WHERE user_id = ?1 ORDER BY rowid",
        &user.id,
    )?;
    user.followers = ids(
        conn,
        "SELECT follower_id FROM user_followers WHERE user_id = ?1 ORDER BY rowid",
        &user.id,
    )?;
    Ok(())
}

/// Sign-up. Validates the fields, hashes the password and stores the user.
pub fn insert(conn: &Connection, fields: &UserFields, cost: u32) -> AppResult<User> {
    let name = fields.name.as_deref().unwrap_or_default().trim().to_string();
    let email = fields.email.as_deref().unwrap_or_default().trim().to_string();
    validate(&name, &email)?;
    let (hashed_password, salt) = hash_new_password(fields.password.as_deref(), cost)?;

    let now = Utc::now();
    let user = User {
        id: new_id(),
        username: fields.username.clone().unwrap_or_default(),
        name,
        email,
        bio: fields.bio.clone().unwrap_or_default(),
        profile_pic: fields
            .profile_pic
            .clone()
            .unwrap_or_else(|| DEFAULT_PROFILE_PIC.to_string()),
        following: Vec::new(),
        followers: Vec::new(),
        created: now,
        updated: now,
    };

    conn.execute(
        "INSERT INTO users (id, username, name, email, bio, profile_pic, hashed_password, salt, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            user.id,
            user.username,
            user.name,
            user.email,
            user.bio,
            fields.profile_pic,
            hashed_password,
            salt,
            user.created,
            user.updated
        ],
    )?;

    tracing::info!(user_id = %user.id, "User signed up");
    Ok(user)
}

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<UserSummary>> {
    let mut stmt = conn.prepare("SELECT name, email, updated, created FROM users ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| {
        Ok(UserSummary {
            name: row.get(0)?,
            email: row.get(1)?,
            updated: row.get(2)?,
            created: row.get(3)?,
        })
    })?;
    rows.collect()
}

pub fn find(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()?;

    match user {
        Some(mut user) => {
            load_relations(conn, &mut user)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

pub fn exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

pub fn credentials_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<Credentials>> {
    conn.query_row(
        "SELECT id, name, email, hashed_password, salt FROM users WHERE email = ?1",
        params![email.trim()],
        |row| {
            Ok(Credentials {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                hashed_password: row.get(3)?,
                salt: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Applies the writable fields onto `current`, bumps `updated` and saves.
/// A `password` field replaces the stored hash and salt.
pub fn update(conn: &Connection, current: &User, fields: &UserFields, cost: u32) -> AppResult<User> {
    let mut user = current.clone();
    if let Some(username) = &fields.username {
        user.username = username.clone();
    }
    if let Some(name) = &fields.name {
        user.name = name.trim().to_string();
    }
    if let Some(email) = &fields.email {
        user.email = email.trim().to_string();
    }
    if let Some(bio) = &fields.bio {
        user.bio = bio.clone();
    }
    if let Some(profile_pic) = &fields.profile_pic {
        user.profile_pic = profile_pic.clone();
    }
    validate(&user.name, &user.email)?;

    let credentials = match fields.password.as_deref() {
        Some(password) => Some(hash_new_password(Some(password), cost)?),
        None => None,
    };
    let (hashed_password, salt) = credentials.unzip();

    user.updated = touch(current.updated);

    let rows = conn.execute(
        "UPDATE users SET username = ?2, name = ?3, email = ?4, bio = ?5, profile_pic = ?6, updated = ?7,
             hashed_password = COALESCE(?8, hashed_password), salt = COALESCE(?9, salt)
         WHERE id = ?1",
        params![
            user.id,
            user.username,
            user.name,
            user.email,
            user.bio,
            user.profile_pic,
            user.updated,
            hashed_password,
            salt
        ],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!(
            "No document found for user {}",
            user.id
        )));
    }

    load_relations(conn, &mut user)?;
    Ok(user)
}

pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("No document found for user {}", id)));
    }
    Ok(())
}

// Follow-list writes. Each one touches a single user's list and is a no-op
// when that user does not exist, so callers get no "not found" signal.

pub fn push_following(conn: &Connection, user_id: &str, target_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR IGNORE INTO user_following (user_id, target_id)
         SELECT id, ?2 FROM users WHERE id = ?1",
        params![user_id, target_id],
    )
}

pub fn push_follower(conn: &Connection, user_id: &str, follower_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR IGNORE INTO user_followers (user_id, follower_id)
         SELECT id, ?2 FROM users WHERE id = ?1",
        params![user_id, follower_id],
    )
}

pub fn pull_following(conn: &Connection, user_id: &str, target_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM user_following WHERE user_id = ?1 AND target_id = ?2",
        params![user_id, target_id],
    )
}

pub fn pull_follower(conn: &Connection, user_id: &str, follower_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM user_followers WHERE user_id = ?1 AND follower_id = ?2",
        params![user_id, follower_id],
    )
}
