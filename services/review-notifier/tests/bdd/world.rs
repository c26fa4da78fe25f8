//! BDD test world for the review notifier

use std::sync::Arc;
use std::time::Duration;

use cucumber::World;
use review_notifier::classifier::NotificationMessage;
use review_notifier::source::StatusRecord;
use review_notifier::supervisor::Supervisor;
use review_notifier::Config;
use tokio_util::sync::CancellationToken;

use crate::doubles::FakeHttpClient;

#[derive(Debug, Default, World)]
pub struct ReviewWorld {
    // Classification
    pub record: Option<StatusRecord>,
    pub classification: Option<review_notifier::Result<NotificationMessage>>,

    // Poll cycles
    pub config: Config,
    pub http: Option<Arc<FakeHttpClient>>,
    pub supervisor: Option<Supervisor>,
    pub last_step: Option<review_notifier::Result<Duration>>,

    // Lifecycle
    pub cancel: Option<CancellationToken>,
    pub build_error: Option<String>,
    pub run_result: Option<review_notifier::Result<()>>,
}

impl ReviewWorld {
    pub fn http(&mut self) -> Arc<FakeHttpClient> {
        self.http
            .get_or_insert_with(|| Arc::new(FakeHttpClient::default()))
            .clone()
    }
}
