//! Status classification: turns a status record into notification text

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::NotificationConfig;
use crate::source::StatusRecord;

const NAME_PLACEHOLDER: &str = "{name}";
const ERROR_PLACEHOLDER: &str = "{error}";

/// Review outcome reported by the remote endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Reviewing,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 3] = [
        ReviewStatus::Reviewing,
        ReviewStatus::Approved,
        ReviewStatus::Rejected,
    ];

    /// The token used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Reviewing => "reviewing",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = crate::ReviewNotifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| crate::ReviewNotifierError::InvalidStatus(s.to_string()))
    }
}

/// Built-in template languages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ru")]
    Russian,
}

/// Rendered notification text, sent at most once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage(String);

impl NotificationMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Template table, one entry per status plus the failure report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub reviewing: String,
    pub approved: String,
    pub rejected: String,
    pub failure: String,
}

impl Templates {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::English => Self {
                reviewing: "Homework \"{name}\" has been taken into review.".to_string(),
                approved: "Homework \"{name}\" has been reviewed!\n\n\
                           The reviewer found no issues, the work is accepted!"
                    .to_string(),
                rejected: "Homework \"{name}\" has been reviewed!\n\n\
                           Unfortunately, the reviewer found issues in the work."
                    .to_string(),
                failure: "Review notifier failure: {error}".to_string(),
            },
            Language::Russian => Self {
                reviewing: "Работа {name} взята в ревью".to_string(),
                approved: "У вас проверили работу \"{name}\"!\n\n\
                           Ревьюеру всё понравилось, работа зачтена!"
                    .to_string(),
                rejected: "У вас проверили работу \"{name}\"!\n\n\
                           К сожалению, в работе нашлись ошибки."
                    .to_string(),
                failure: "Сбой в работе бота: {error}".to_string(),
            },
        }
    }

    /// Replace built-in status templates, checking each override
    pub fn with_overrides(
        mut self,
        overrides: &HashMap<ReviewStatus, String>,
    ) -> crate::Result<Self> {
        for (status, template) in overrides {
            check_template(*status, template)?;
            *self.slot_mut(*status) = template.clone();
        }
        Ok(self)
    }

    pub fn template(&self, status: ReviewStatus) -> &str {
        match status {
            ReviewStatus::Reviewing => &self.reviewing,
            ReviewStatus::Approved => &self.approved,
            ReviewStatus::Rejected => &self.rejected,
        }
    }

    fn slot_mut(&mut self, status: ReviewStatus) -> &mut String {
        match status {
            ReviewStatus::Reviewing => &mut self.reviewing,
            ReviewStatus::Approved => &mut self.approved,
            ReviewStatus::Rejected => &mut self.rejected,
        }
    }

    /// Pure substitution of `{name}`
    pub fn render(&self, status: ReviewStatus, name: &str) -> NotificationMessage {
        NotificationMessage(self.template(status).replace(NAME_PLACEHOLDER, name))
    }

    pub fn render_failure(&self, error: &str) -> NotificationMessage {
        NotificationMessage(self.failure.replace(ERROR_PLACEHOLDER, error))
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::for_language(Language::default())
    }
}

/// A status template must name the item and must not leak a status token
pub fn check_template(status: ReviewStatus, template: &str) -> crate::Result<()> {
    if !template.contains(NAME_PLACEHOLDER) {
        return Err(crate::ReviewNotifierError::Config(format!(
            "template for '{}' must contain {}",
            status, NAME_PLACEHOLDER
        )));
    }
    let lowered = template.to_lowercase();
    if let Some(token) = ReviewStatus::ALL
        .iter()
        .map(ReviewStatus::as_str)
        .find(|token| lowered.contains(token))
    {
        return Err(crate::ReviewNotifierError::Config(format!(
            "template for '{}' must not contain the status token '{}'",
            status, token
        )));
    }
    Ok(())
}

/// Maps status records to messages; performs no I/O
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    templates: Templates,
}

impl Classifier {
    pub fn new(templates: Templates) -> Self {
        Self { templates }
    }

    pub fn from_config(config: &NotificationConfig) -> crate::Result<Self> {
        let templates =
            Templates::for_language(config.language).with_overrides(&config.templates)?;
        Ok(Self::new(templates))
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    pub fn classify(&self, record: &StatusRecord) -> crate::Result<NotificationMessage> {
        if record.status.is_empty() {
            return Err(crate::ReviewNotifierError::InvalidStatus(
                "record has no status".to_string(),
            ));
        }
        let status: ReviewStatus = record.status.parse()?;
        if record.name.trim().is_empty() {
            return Err(crate::ReviewNotifierError::InvalidStatus(
                "record has no homework_name".to_string(),
            ));
        }
        Ok(self.templates.render(status, &record.name))
    }
}
