//! Workspaces, the device user profile and settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a workspace; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl WorkspacePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, workspace: &mut Workspace) {
        if let Some(title) = self.title {
            workspace.title = title;
        }
        if let Some(description) = self.description {
            workspace.description = description;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    pub const DEFAULT_NAME: &'static str = "Thinker";

    pub fn with_defaults(id: String) -> Self {
        Self {
            id,
            name: Self::DEFAULT_NAME.to_string(),
            email: String::new(),
            avatar: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    /// `Some(None)` clears the avatar
    pub avatar: Option<Option<String>>,
}

impl UserPatch {
    pub(crate) fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(avatar) = self.avatar {
            user.avatar = avatar;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub notifications: bool,
    pub auto_generate: bool,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications: true,
            auto_generate: false,
            theme: Theme::System,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub notifications: Option<bool>,
    pub auto_generate: Option<bool>,
    pub theme: Option<Theme>,
}

impl SettingsPatch {
    pub(crate) fn apply(self, settings: &mut Settings) {
        if let Some(v) = self.notifications {
            settings.notifications = v;
        }
        if let Some(v) = self.auto_generate {
            settings.auto_generate = v;
        }
        if let Some(v) = self.theme {
            settings.theme = v;
        }
    }
}
