//! Supervisor: runs poll cycles forever and contains every failure

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::classifier::Classifier;
use crate::config::{Config, DispatchMode};
use crate::dispatcher::Dispatcher;
use crate::source::{StatusRecord, StatusSource};
use crate::state::{next_delay, LoopState, PollCursor};
use crate::ReviewNotifierError;

/// Loop cadence and failure policy
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub interval: Duration,
    pub retry_interval: Duration,
    pub max_backoff: Duration,
    pub dispatch: DispatchMode,
    pub report_failures: bool,
    pub exit_on_revoked_credentials: bool,
}

impl SupervisorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.polling.interval(),
            retry_interval: config.polling.retry_interval(),
            max_backoff: config.polling.max_backoff(),
            dispatch: config.polling.dispatch,
            report_failures: config.notifications.report_failures,
            exit_on_revoked_credentials: config.polling.exit_on_revoked_credentials,
        }
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of a cycle that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The poll returned no records
    Idle,
    /// This many notifications were delivered
    Notified(usize),
}

/// Owns the cursor and drives poll, classify and dispatch
#[derive(Debug)]
pub struct Supervisor {
    source: Arc<dyn StatusSource>,
    classifier: Classifier,
    dispatcher: Dispatcher,
    settings: SupervisorSettings,
    state: LoopState,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(
        source: Arc<dyn StatusSource>,
        classifier: Classifier,
        dispatcher: Dispatcher,
        settings: SupervisorSettings,
        cursor: PollCursor,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            classifier,
            dispatcher,
            settings,
            state: LoopState::new(cursor),
            cancel,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn cursor(&self) -> PollCursor {
        self.state.cursor
    }

    /// One poll cycle without failure containment.
    ///
    /// The cursor moves as soon as the poll succeeds, so a record that then
    /// fails classification is dropped rather than retried.
    pub async fn run_cycle(&mut self) -> crate::Result<CycleOutcome> {
        let response = self.source.poll(self.state.cursor).await?;

        let previous = self.state.cursor;
        if self.state.cursor.advance(response.next_cursor) {
            tracing::debug!("Cursor moved {} -> {}", previous, self.state.cursor);
        }

        let records: Vec<&StatusRecord> = match self.settings.dispatch {
            DispatchMode::Latest => response.records.first().into_iter().collect(),
            DispatchMode::All => response.records.iter().rev().collect(),
        };

        if records.is_empty() {
            tracing::debug!("No new reviews");
            return Ok(CycleOutcome::Idle);
        }

        let mut delivered = 0;
        for record in records {
            tracing::debug!(
                "Review record: id={}, lesson={:?}, updated={:?}, comment={:?}",
                record
                    .id
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                record.lesson_name,
                record.date_updated,
                record.reviewer_comment
            );

            let message = match self.classifier.classify(record) {
                Ok(message) => message,
                // The rest of the batch is still worth sending
                Err(e) if self.settings.dispatch == DispatchMode::All => {
                    tracing::warn!("Skipping record '{}': {}", record.name, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.dispatcher.dispatch(&message).await?;
            tracing::info!("Sent message: {}", message);
            delivered += 1;
        }
        Ok(CycleOutcome::Notified(delivered))
    }

    /// Run one cycle, absorb its failure and return the pause before the
    /// next one. Errors only for revoked credentials when configured to exit.
    pub async fn step(&mut self) -> crate::Result<Duration> {
        tracing::debug!("Starting poll cycle, cursor={}", self.state.cursor);

        let failure = match self.run_cycle().await {
            Ok(outcome) => {
                tracing::debug!("Cycle finished: {:?}", outcome);
                self.state.record_success();
                None
            }
            Err(e) => {
                self.state.record_failure();
                Some(e)
            }
        };

        let delay = next_delay(
            self.state.phase,
            self.settings.interval,
            self.settings.retry_interval,
            self.settings.max_backoff,
        );

        if let Some(e) = failure {
            tracing::warn!(
                "Cycle failed [{}] ({} in a row), retrying in {:?}: {}",
                e.kind(),
                self.state.consecutive_failures(),
                delay,
                e
            );

            if e.is_fatal_for_loop() {
                if self.settings.exit_on_revoked_credentials {
                    tracing::error!("Messaging credentials revoked, stopping: {}", e);
                    return Err(e);
                }
                tracing::error!("Messaging credentials revoked, still polling: {}", e);
            }

            if self.settings.report_failures
                && !e.is_channel_failure()
                && self.state.should_report(&e)
            {
                self.report_failure(&e).await;
            }
        }

        Ok(delay)
    }

    /// Best effort; a failed report is logged and dropped
    async fn report_failure(&self, error: &ReviewNotifierError) {
        let message = self
            .classifier
            .templates()
            .render_failure(&error.to_string());
        match self.dispatcher.dispatch(&message).await {
            Ok(_) => tracing::debug!("Reported failure to chat {}", self.dispatcher.chat_id()),
            Err(report_err) => {
                tracing::warn!("Failed to report failure to chat: {}", report_err)
            }
        }
    }

    /// Loop until cancelled. Every failure is contained except revoked
    /// credentials with `exit_on_revoked_credentials` set.
    pub async fn run(mut self) -> crate::Result<()> {
        tracing::info!(
            "Review notifier started, cursor={}, interval={:?}",
            self.state.cursor,
            self.settings.interval
        );

        loop {
            let delay = self.step().await?;
            tracing::debug!("Next poll in {:?}", delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Poll loop cancelled");
                    break;
                }
            }
        }

        tracing::info!("Review notifier stopped, cursor={}", self.state.cursor);
        Ok(())
    }
}
