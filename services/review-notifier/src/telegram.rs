//! Telegram Bot API message channel

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TelegramConfig;
use crate::dispatcher::MessageChannel;
use crate::io::HttpClient;
use crate::ReviewNotifierError;

/// Bot API reply envelope
#[derive(Debug, Deserialize)]
struct BotApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages with the Bot API `sendMessage` method
pub struct TelegramChannel {
    send_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // send_url embeds the bot token
        f.debug_struct("TelegramChannel").finish_non_exhaustive()
    }
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig, http: Arc<dyn HttpClient>) -> crate::Result<Self> {
        let token = config.token.as_deref().ok_or_else(|| {
            ReviewNotifierError::Config("Telegram token has not been resolved".to_string())
        })?;

        tracing::debug!("Created TelegramChannel via {}", config.api_base);

        Ok(Self {
            send_url: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                token
            ),
            http,
        })
    }
}

/// Map a Bot API reply to a delivery outcome. 401, and 403 for a deleted or
/// deactivated bot, mean the credential is gone for good.
fn interpret_reply(status: u16, body: &str) -> crate::Result<()> {
    let reply = serde_json::from_str::<BotApiReply>(body).ok();
    let description = reply
        .as_ref()
        .and_then(|r| r.description.clone())
        .unwrap_or_else(|| body.to_string());

    if status == 200 && reply.as_ref().map(|r| r.ok).unwrap_or(false) {
        return Ok(());
    }

    let revoked = status == 401
        || (status == 403 && {
            let lowered = description.to_lowercase();
            lowered.contains("bot was deleted") || lowered.contains("deactivated")
        });

    if revoked {
        Err(ReviewNotifierError::CredentialRevoked(format!(
            "Telegram API returned status {}: {}",
            status, description
        )))
    } else {
        Err(ReviewNotifierError::Delivery(format!(
            "Telegram API returned status {}: {}",
            status, description
        )))
    }
}

#[async_trait]
impl MessageChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, chat_id: &str, text: &str) -> crate::Result<()> {
        tracing::debug!("Sending Telegram message to chat {}", chat_id);

        let response = self
            .http
            .post_form(&self.send_url, &[("chat_id", chat_id), ("text", text)])
            .await
            .map_err(|e| match e {
                ReviewNotifierError::Transport(msg) => ReviewNotifierError::Delivery(msg),
                other => other,
            })?;

        interpret_reply(response.status, &response.body)?;
        tracing::debug!("Telegram message sent successfully");
        Ok(())
    }
}
