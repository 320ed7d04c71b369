use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{CoreError, encode_pretty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MailMethod {
    #[default]
    None,
    Gmail,
    Outlook,
}

impl MailMethod {
    pub const ALL: [MailMethod; 3] = [MailMethod::None, MailMethod::Gmail, MailMethod::Outlook];

    pub fn as_str(self) -> &'static str {
        match self {
            MailMethod::None => "none",
            MailMethod::Gmail => "gmail",
            MailMethod::Outlook => "outlook",
        }
    }
}

impl fmt::Display for MailMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MailMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MailMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CoreError::UnknownMailMethod(s.to_owned()))
    }
}

/// On-disk shape of `settings.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsDocument {
    #[serde(default)]
    preferred_mail_method: Option<String>,
    #[serde(default)]
    blacklisted_apps: Vec<String>,
    #[serde(default)]
    blacklisted_windows: Vec<String>,
}

/// User preferences edited from the main window.
///
/// `preferred_mail` is `None` when nothing valid was loaded; it is written
/// back as `"none"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub preferred_mail: Option<MailMethod>,
    pub blacklisted_apps: Vec<String>,
    pub blacklisted_windows: Vec<String>,
}

impl Settings {
    pub fn from_json(data: &str) -> Result<Self, CoreError> {
        let doc: SettingsDocument =
            serde_json::from_str(data).map_err(CoreError::MalformedSettings)?;
        Ok(Self {
            preferred_mail: doc
                .preferred_mail_method
                .as_deref()
                .and_then(|m| m.parse().ok()),
            blacklisted_apps: doc.blacklisted_apps,
            blacklisted_windows: doc.blacklisted_windows,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        let doc = SettingsDocument {
            preferred_mail_method: Some(self.preferred_mail.unwrap_or_default().to_string()),
            blacklisted_apps: self.blacklisted_apps.clone(),
            blacklisted_windows: self.blacklisted_windows.clone(),
        };
        encode_pretty(&doc)
    }

    /// Appends a trimmed app name. Blank input is ignored.
    pub fn add_app(&mut self, name: &str) -> bool {
        push_trimmed(&mut self.blacklisted_apps, name)
    }

    pub fn add_window(&mut self, title: &str) -> bool {
        push_trimmed(&mut self.blacklisted_windows, title)
    }

    pub fn remove_app(&mut self, index: usize) -> Option<String> {
        (index < self.blacklisted_apps.len()).then(|| self.blacklisted_apps.remove(index))
    }

    pub fn remove_window(&mut self, index: usize) -> Option<String> {
        (index < self.blacklisted_windows.len()).then(|| self.blacklisted_windows.remove(index))
    }
}

fn push_trimmed(list: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    list.push(value.to_owned());
    true
}
