//! Message channel trait and the dispatcher bound to one chat

use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::NotificationMessage;

/// Trait for delivering plain-text messages to a chat
#[async_trait]
pub trait MessageChannel: Send + Sync + std::fmt::Debug {
    /// Channel name used in logs (e.g. "telegram")
    fn name(&self) -> &str;

    /// Send `text` to `chat_id`
    async fn send(&self, chat_id: &str, text: &str) -> crate::Result<()>;
}

/// Proof of a successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub chat_id: String,
}

/// Sends finished messages to the configured destination
#[derive(Debug, Clone)]
pub struct Dispatcher {
    channel: Arc<dyn MessageChannel>,
    chat_id: String,
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn MessageChannel>, chat_id: impl Into<String>) -> Self {
        Self {
            channel,
            chat_id: chat_id.into(),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Exactly one send per call; no retry
    pub async fn dispatch(&self, message: &NotificationMessage) -> crate::Result<Delivered> {
        tracing::debug!(
            "Dispatching via '{}' to chat {}",
            self.channel.name(),
            self.chat_id
        );
        self.channel.send(&self.chat_id, message.as_str()).await?;
        Ok(Delivered {
            chat_id: self.chat_id.clone(),
        })
    }
}
