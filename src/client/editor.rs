use std::path::Path;

use tokio::sync::watch;

use crate::client::{ApiClient, ClientError, Session};
use crate::db::models::{User, DEFAULT_PROFILE_PIC};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient message for the user, like a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Editable copy of the signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileForm {
    pub username: String,
    pub name: String,
    pub email: String,
    pub bio: String,
    pub profile_pic: String,
}

impl Default for ProfileForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            name: String::new(),
            email: String::new(),
            bio: String::new(),
            profile_pic: DEFAULT_PROFILE_PIC.to_string(),
        }
    }
}

impl ProfileForm {
    fn replace_from(&mut self, user: &User) {
        self.username = user.username.clone();
        self.name = user.name.clone();
        self.email = user.email.clone();
        self.bio = user.bio.clone();
        self.profile_pic = if user.profile_pic.is_empty() {
            DEFAULT_PROFILE_PIC.to_string()
        } else {
            user.profile_pic.clone()
        };
    }
}

/// A new profile picture picked by the user.
#[derive(Debug, Clone)]
pub struct Picture {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Picture {
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "picture".to_string());
        Ok(Self { file_name, bytes })
    }
}

pub struct ProfileEditor {
    client: ApiClient,
    session: Option<Session>,
    pub form: ProfileForm,
    picture: Option<Picture>,
    loading: watch::Sender<bool>,
    error: Option<String>,
    notices: Vec<Notice>,
}

impl ProfileEditor {
    pub fn new(client: ApiClient, session: Option<Session>) -> Self {
        Self {
            client,
            session,
            form: ProfileForm::default(),
            picture: None,
            loading: watch::Sender::new(false),
            error: None,
            notices: Vec::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Follows the loading flag while a save is in flight.
    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Inline error left by the last failed save.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn set_picture(&mut self, picture: Picture) {
        self.picture = Some(picture);
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Success => tracing::info!("{}", message),
            NoticeLevel::Error => tracing::warn!("{}", message),
        }
        self.notices.push(Notice { level, message });
    }

    fn signed_in(&self) -> Option<&Session> {
        self.session
            .as_ref()
            .filter(|s| !s.token.is_empty() && !s.user_id.is_empty())
    }

    /// Populates the form from the server.
    pub async fn load(&mut self) {
        let Some(session) = self.signed_in().cloned() else {
            self.notify(NoticeLevel::Error, "User is not logged in.");
            return;
        };

        match self.client.fetch_user(&session).await {
            Ok(user) => self.form.replace_from(&user),
            Err(e) => {
                let message = failure_message(&e, "Failed to load user data.");
                self.notify(NoticeLevel::Error, message);
            }
        }
    }

    /// Submits the form and the picked picture, if any. On success the form
    /// mirrors what the server stored.
    pub async fn save(&mut self) {
        let Some(session) = self
            .session
            .clone()
            .filter(|s| !s.user_id.is_empty())
        else {
            self.notify(NoticeLevel::Error, "User ID is missing.");
            return;
        };

        self.loading.send_replace(true);
        let result = self
            .client
            .update_profile(&session, &self.form, self.picture.as_ref())
            .await;
        self.loading.send_replace(false);

        match result {
            Ok(user) => {
                self.form.replace_from(&user);
                self.picture = None;
                self.error = None;
                self.notify(NoticeLevel::Success, "Profile updated successfully!");
            }
            Err(e) => {
                let message = failure_message(&e, "Failed to update profile.");
                self.error = Some(message.clone());
                self.notify(NoticeLevel::Error, message);
            }
        }
    }
}

fn failure_message(err: &ClientError, fallback: &str) -> String {
    tracing::debug!("Profile request failed: {}", err);
    err.server_message().unwrap_or(fallback).to_string()
}
