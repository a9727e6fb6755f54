use serde::{Deserialize, Serialize};

/// Per-account preferences persisted in `accounts.settings_json`.
///
/// Every field is optional so the same struct doubles as a sparse patch:
/// merging a patch only overwrites the keys the patch carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    /// "public" | "members" | "private"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_visibility: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl AccountSettings {
    /// Applies a sparse patch. Keys absent from the patch keep their
    /// current value; a patch is never a full replace.
    pub fn merge(&mut self, patch: Self) {
        if patch.theme.is_some() {
            self.theme = patch.theme;
        }
        if patch.profile_visibility.is_some() {
            self.profile_visibility = patch.profile_visibility;
        }
        if patch.email_notifications.is_some() {
            self.email_notifications = patch.email_notifications;
        }
        if patch.language.is_some() {
            self.language = patch.language;
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Tolerates an empty column from older rows.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }
}
