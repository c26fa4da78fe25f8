//! Review notifier - homework review status poller
//!
//! Polls the review-status API, turns newly reviewed items into messages and
//! delivers them to a Telegram chat.

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod io;
pub mod poller;
pub mod source;
pub mod state;
pub mod supervisor;
pub mod telegram;

pub use config::{load_config, Config};
pub use error::{ErrorKind, Result, ReviewNotifierError};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::classifier::Classifier;
use crate::dispatcher::{Dispatcher, MessageChannel};
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::poller::HomeworkPoller;
use crate::source::StatusSource;
use crate::state::PollCursor;
use crate::supervisor::{Supervisor, SupervisorSettings};
use crate::telegram::TelegramChannel;

/// Wires the service together; the HTTP client and cancellation token can be injected
pub struct ReviewNotifierBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    cancel: Option<CancellationToken>,
}

impl ReviewNotifierBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            cancel: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Result<ReviewNotifier> {
        let config = self.config;
        config.validate()?;

        let chat_id = config.telegram.chat_id.clone().ok_or_else(|| {
            ReviewNotifierError::Config("Telegram chat id has not been resolved".to_string())
        })?;

        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::with_timeout(
                std::time::Duration::from_secs(config.api.request_timeout_seconds),
            )?),
        };

        let source: Arc<dyn StatusSource> =
            Arc::new(HomeworkPoller::new(&config.api, Arc::clone(&http))?);
        let channel: Arc<dyn MessageChannel> =
            Arc::new(TelegramChannel::new(&config.telegram, http)?);

        let classifier = Classifier::from_config(&config.notifications)?;
        let cursor = config
            .polling
            .from_date
            .map(PollCursor::new)
            .unwrap_or_else(PollCursor::now);
        let cancel = self.cancel.unwrap_or_default();

        tracing::debug!(
            "Built review notifier: source={:?}, channel={}, cursor={}",
            source,
            channel.name(),
            cursor
        );

        let supervisor = Supervisor::new(
            source,
            classifier,
            Dispatcher::new(channel, chat_id),
            SupervisorSettings::from_config(&config),
            cursor,
            cancel.clone(),
        );

        Ok(ReviewNotifier { supervisor, cancel })
    }
}

/// A fully wired service, ready to start
pub struct ReviewNotifier {
    supervisor: Supervisor,
    cancel: CancellationToken,
}

impl ReviewNotifier {
    /// Run until Ctrl-C or cancellation
    pub async fn start(self) -> Result<()> {
        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                Err(e) => tracing::warn!("Failed to listen for ctrl-c: {}", e),
            }
        });

        self.supervisor.run().await
    }
}
