use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE_PIC: &str = "/default-profile.png";

/// Comments are owned by another service; posts only hold their ids.
pub type CommentId = String;

/// A user as it is returned by the API. Credentials live in
/// [`Credentials`] and are never part of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub bio: String,
    #[serde(rename = "profilePic")]
    pub profile_pic: String,
    pub following: Vec<String>,
    pub followers: Vec<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Projection used by the user listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
    pub updated: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: String,
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub salt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub photo: String,
    pub user: String,
    pub likes: Vec<String>,
    pub comments: Vec<CommentId>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Writable user fields accepted from clients. Anything else in a request
/// body (follow lists, credentials, timestamps, ids) is dropped here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserFields {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    #[serde(rename = "profilePic")]
    pub profile_pic: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostFields {
    pub content: Option<String>,
    pub photo: Option<String>,
}
