//! HTTP client for the social API, used by the `social-profile` binary.

mod editor;

pub use editor::{Notice, NoticeLevel, Picture, ProfileEditor, ProfileForm};

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::db::models::User;

pub const API_URL_VAR: &str = "SOCIAL_API_URL";
pub const PUBLISHABLE_KEY_VAR: &str = "SOCIAL_PUBLISHABLE_KEY";
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Add your publishable key to SOCIAL_PUBLISHABLE_KEY")]
    MissingPublishableKey,

    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response. `message` is the server's `error` (or
    /// `message`) text when it sent one.
    #[error("API returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file error: {0}")]
    Session(#[from] serde_json::Error),
}

impl ClientError {
    /// Text the server sent with a failed response, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
}

impl ClientConfig {
    /// Refuses to build without a publishable key. The key is only a boot
    /// gate; requests authenticate with the session's bearer token.
    pub fn new(base_url: &str, publishable_key: Option<&str>) -> Result<Self, ClientError> {
        if publishable_key.map_or(true, |key| key.trim().is_empty()) {
            return Err(ClientError::MissingPublishableKey);
        }
        Ok(Self {
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var(API_URL_VAR).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let publishable_key = std::env::var(PUBLISHABLE_KEY_VAR).ok();
        Self::new(&base_url, publishable_key.as_deref())
    }
}

/// A signed-in identity: the user id and the bearer token issued for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

impl Session {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".social")
            .join("session.json")
    }

    pub fn load(path: &Path) -> Result<Option<Self>, ClientError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), ClientError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SigninResponse {
    token: String,
    user: SignedInUser,
}

#[derive(Debug, Deserialize)]
struct SignedInUser {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.config.base_url.join(path)?)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(ClientError::Api {
            status,
            message: body.error.or(body.message),
        })
    }

    pub async fn signin(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/signin")?)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: SigninResponse = Self::check(response).await?.json().await?;
        Ok(Session {
            user_id: body.user.id,
            token: body.token,
        })
    }

    pub async fn fetch_user(&self, session: &Session) -> Result<User, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/users/{}", session.user_id))?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Multipart `PUT /api/users/update/{userId}`.
    pub async fn update_profile(
        &self,
        session: &Session,
        form: &ProfileForm,
        picture: Option<&Picture>,
    ) -> Result<User, ClientError> {
        let mut multipart = Form::new()
            .text("username", form.username.clone())
            .text("name", form.name.clone())
            .text("email", form.email.clone())
            .text("bio", form.bio.clone());
        if let Some(picture) = picture {
            let part = Part::bytes(picture.bytes.clone()).file_name(picture.file_name.clone());
            multipart = multipart.part("profilePic", part);
        }

        let response = self
            .http
            .put(self.url(&format!("/api/users/update/{}", session.user_id))?)
            .bearer_auth(&session.token)
            .multipart(multipart)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
