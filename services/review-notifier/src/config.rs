//! Configuration types for the review notifier

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classifier::{Language, ReviewStatus};

pub const API_TOKEN_VAR: &str = "PRAKTIKUM_TOKEN";
pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_TOKEN";
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Review-status endpoint settings
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &redacted(&self.token))
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

/// Telegram Bot API settings
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            token: None,
            chat_id: None,
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_base", &self.api_base)
            .field("token", &redacted(&self.token))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Which records of a poll response get a notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Only the head record (the most recently updated one)
    #[default]
    Latest,
    /// Every record, oldest first
    All,
}

/// Poll loop cadence and policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_interval")]
    pub retry_interval_seconds: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_seconds: u64,
    /// Initial cursor; `None` means "now", 0 requests the full history
    #[serde(default)]
    pub from_date: Option<i64>,
    #[serde(default)]
    pub dispatch: DispatchMode,
    #[serde(default)]
    pub exit_on_revoked_credentials: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            retry_interval_seconds: default_interval(),
            max_backoff_seconds: default_max_backoff(),
            from_date: None,
            dispatch: DispatchMode::default(),
            exit_on_revoked_credentials: false,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_seconds)
    }
}

/// Notification wording and failure reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_true")]
    pub report_failures: bool,
    /// Per-status overrides of the built-in templates
    #[serde(default)]
    pub templates: HashMap<ReviewStatus, String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            report_failures: true,
            templates: HashMap::new(),
        }
    }
}

fn redacted(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

fn default_endpoint() -> String {
    "https://practicum.yandex.ru/api/user_api/homework_statuses/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_interval() -> u64 {
    300
}

fn default_max_backoff() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Fill the secrets from the environment, which wins over the file.
    ///
    /// Fails fast naming the first variable that is missing or empty.
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        self.resolve_secrets_with(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::resolve_secrets`] with an injectable lookup
    pub fn resolve_secrets_with<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |name: &str, current: &Option<String>| -> crate::Result<String> {
            lookup(name)
                .or_else(|| current.clone())
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    crate::ReviewNotifierError::Config(format!(
                        "environment variable {} is not set",
                        name
                    ))
                })
        };

        let api_token = pick(API_TOKEN_VAR, &self.api.token)?;
        let telegram_token = pick(TELEGRAM_TOKEN_VAR, &self.telegram.token)?;
        let chat_id = pick(CHAT_ID_VAR, &self.telegram.chat_id)?;

        self.api.token = Some(api_token);
        self.telegram.token = Some(telegram_token);
        self.telegram.chat_id = Some(chat_id);
        Ok(())
    }

    /// Check values that serde accepts but the service cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        let fail = |msg: String| Err(crate::ReviewNotifierError::Config(msg));

        if self.api.endpoint.trim().is_empty() {
            return fail("api.endpoint must not be empty".to_string());
        }
        if self.telegram.api_base.trim().is_empty() {
            return fail("telegram.api_base must not be empty".to_string());
        }
        if self.api.request_timeout_seconds == 0 {
            return fail("api.request_timeout_seconds must be greater than 0".to_string());
        }
        if self.polling.interval_seconds == 0 || self.polling.retry_interval_seconds == 0 {
            return fail("polling intervals must be greater than 0".to_string());
        }
        if self.polling.max_backoff_seconds < self.polling.retry_interval_seconds {
            return fail(format!(
                "polling.max_backoff_seconds ({}) is below polling.retry_interval_seconds ({})",
                self.polling.max_backoff_seconds, self.polling.retry_interval_seconds
            ));
        }
        for (status, template) in &self.notifications.templates {
            crate::classifier::check_template(*status, template)?;
        }
        Ok(())
    }
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::ReviewNotifierError::Config(format!(
            "Failed to read config file {:?}: {}",
            path, e
        ))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
