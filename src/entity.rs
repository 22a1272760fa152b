//! Row and payload shapes exchanged with the backend's HTTP API

use crate::domain::auth::{Session, User};
use crate::domain::category::{Category, NewCategory};
use crate::domain::profile::Profile;
use crate::domain::todo::{NewTodo, Todo, TodoUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of the `todos` table
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TodoRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub category_id: Option<Uuid>,
}

impl From<TodoRow> for Todo {
    fn from(value: TodoRow) -> Self {
        Todo {
            id: value.id,
            user_id: value.user_id,
            text: value.text,
            completed: value.completed,
            created_at: value.created_at,
            category_id: value.category_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TodoInsert<'a> {
    pub user_id: Uuid,
    pub text: &'a str,
    pub completed: bool,
    pub category_id: Option<Uuid>,
}

impl<'a> From<&'a NewTodo> for TodoInsert<'a> {
    fn from(value: &'a NewTodo) -> Self {
        TodoInsert {
            user_id: value.user_id,
            text: &value.text,
            completed: false,
            category_id: value.category_id,
        }
    }
}

/// PATCH body touching a single `todos` column
#[derive(Debug, Serialize)]
pub enum TodoPatch<'a> {
    #[serde(rename = "completed")]
    Completed(bool),
    #[serde(rename = "text")]
    Text(&'a str),
    #[serde(rename = "category_id")]
    Category(Option<Uuid>),
}

impl<'a> From<&'a TodoUpdate> for TodoPatch<'a> {
    fn from(value: &'a TodoUpdate) -> Self {
        match value {
            TodoUpdate::Completed(completed) => TodoPatch::Completed(*completed),
            TodoUpdate::Text(text) => TodoPatch::Text(text),
            TodoUpdate::Category(category_id) => TodoPatch::Category(*category_id),
        }
    }
}

/// A row of the `categories` table
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CategoryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(value: CategoryRow) -> Self {
        Category {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
            color: value.color,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryInsert<'a> {
    pub user_id: Uuid,
    pub name: &'a str,
    pub color: &'a str,
}

impl<'a> From<&'a NewCategory> for CategoryInsert<'a> {
    fn from(value: &'a NewCategory) -> Self {
        CategoryInsert {
            user_id: value.user_id,
            name: &value.name,
            color: &value.color,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryPatch<'a> {
    pub name: &'a str,
    pub color: &'a str,
}

/// A row of the `profiles` table. Also the upsert body, so nulls are sent explicitly.
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProfileRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub about: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for Profile {
    fn from(value: ProfileRow) -> Self {
        Profile {
            id: value.id,
            name: value.name,
            tagline: value.tagline,
            about: value.about,
            city: value.city,
            country: value.country,
            twitter: value.twitter,
            facebook: value.facebook,
            instagram: value.instagram,
            linkedin: value.linkedin,
            avatar_url: value.avatar_url,
            updated_at: value.updated_at,
        }
    }
}

impl From<&Profile> for ProfileRow {
    fn from(value: &Profile) -> Self {
        ProfileRow {
            id: value.id,
            name: value.name.clone(),
            tagline: value.tagline.clone(),
            about: value.about.clone(),
            city: value.city.clone(),
            country: value.country.clone(),
            twitter: value.twitter.clone(),
            facebook: value.facebook.clone(),
            instagram: value.instagram.clone(),
            linkedin: value.linkedin.clone(),
            avatar_url: value.avatar_url.clone(),
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvatarPatch<'a> {
    pub avatar_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// The user object returned by the auth endpoints
#[derive(Debug, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

impl From<AuthUser> for User {
    fn from(value: AuthUser) -> Self {
        User {
            id: value.id,
            email: value.email.unwrap_or_default(),
        }
    }
}

/// Response of the password grant
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds since the unix epoch
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(value: TokenResponse) -> Self {
        Session {
            access_token: value.access_token,
            refresh_token: value.refresh_token,
            expires_at: value
                .expires_at
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
            user: value.user.into(),
        }
    }
}

/// Error payload. Different backend services put the readable text under different keys.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub msg: Option<String>,
    pub error_description: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}
