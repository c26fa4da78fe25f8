//! BDD step definitions for the poll cycle feature

use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use review_notifier::classifier::Classifier;
use review_notifier::config::DispatchMode;
use review_notifier::dispatcher::Dispatcher;
use review_notifier::poller::HomeworkPoller;
use review_notifier::state::PollCursor;
use review_notifier::supervisor::{Supervisor, SupervisorSettings};
use review_notifier::telegram::TelegramChannel;
use review_notifier::Config;

use crate::world::ReviewWorld;

/// Fill in the secrets a test run needs without touching the environment
pub fn with_test_secrets(mut config: Config) -> Config {
    config.api.token.get_or_insert_with(|| "api-token".to_string());
    config.telegram.token.get_or_insert_with(|| "123:bot".to_string());
    config.telegram.chat_id.get_or_insert_with(|| "42".to_string());
    config
}

/// Wire the real poller and Telegram channel over the fake HTTP client
fn supervisor(world: &mut ReviewWorld) -> &mut Supervisor {
    if world.supervisor.is_none() {
        let config = with_test_secrets(world.config.clone());
        let http = world.http();

        let poller = HomeworkPoller::new(&config.api, http.clone()).expect("poller");
        let channel = TelegramChannel::new(&config.telegram, http).expect("channel");
        let classifier = Classifier::from_config(&config.notifications).expect("classifier");
        let chat_id = config.telegram.chat_id.clone().expect("chat id");

        world.supervisor = Some(Supervisor::new(
            Arc::new(poller),
            classifier,
            Dispatcher::new(Arc::new(channel), chat_id),
            SupervisorSettings::from_config(&config),
            PollCursor::new(config.polling.from_date.unwrap_or(0)),
            CancellationToken::new(),
        ));
    }
    world.supervisor.as_mut().expect("supervisor")
}

// --- Given steps ---

#[given(expr = "the cursor is at {int}")]
fn cursor_is_at(world: &mut ReviewWorld, cursor: i64) {
    world.config.polling.from_date = Some(cursor);
}

#[given("failure reports are disabled")]
fn failure_reports_disabled(world: &mut ReviewWorld) {
    world.config.notifications.report_failures = false;
}

#[given("failure reports are enabled")]
fn failure_reports_enabled(world: &mut ReviewWorld) {
    world.config.notifications.report_failures = true;
}

#[given("every record is dispatched")]
fn every_record_dispatched(world: &mut ReviewWorld) {
    world.config.polling.dispatch = DispatchMode::All;
}

#[given("the notifier stops on revoked credentials")]
fn stops_on_revoked(world: &mut ReviewWorld) {
    world.config.polling.exit_on_revoked_credentials = true;
}

#[given(expr = "the retry interval is {int} seconds and the backoff cap is {int} seconds")]
fn retry_and_cap(world: &mut ReviewWorld, retry: u64, cap: u64) {
    world.config.polling.retry_interval_seconds = retry;
    world.config.polling.max_backoff_seconds = cap;
}

#[given(expr = "the review API responds with {string}")]
async fn api_responds(world: &mut ReviewWorld, body: String) {
    world.http().push_get(200, &body).await;
}

#[given(expr = "the review API responds with status {int} and body {string}")]
async fn api_responds_with_status(world: &mut ReviewWorld, status: u16, body: String) {
    world.http().push_get(status, &body).await;
}

#[given("the review API is unreachable once")]
async fn api_unreachable_once(world: &mut ReviewWorld) {
    world.http().push_get_error("connection reset by peer").await;
}

// --- When steps ---

#[when("a poll cycle runs")]
async fn poll_cycle_runs(world: &mut ReviewWorld) {
    let result = supervisor(world).step().await;
    world.last_step = Some(result);
}

#[when(expr = "{int} poll cycles run")]
async fn poll_cycles_run(world: &mut ReviewWorld, cycles: usize) {
    for _ in 0..cycles {
        let result = supervisor(world).step().await;
        world.last_step = Some(result);
    }
}

// --- Then steps ---

#[then(expr = "the review API should have been queried with from_date {int}")]
async fn queried_with_from_date(world: &mut ReviewWorld, from_date: i64) {
    let gets = world.http().gets().await;
    let first = gets.first().expect("no GET request recorded");
    assert_eq!(first.param("from_date"), Some(from_date.to_string().as_str()));
    assert!(
        first
            .headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v.starts_with("OAuth ")),
        "missing OAuth header: {:?}",
        first.headers
    );
}

#[then(expr = "the review API should have been polled {int} times")]
async fn polled_times(world: &mut ReviewWorld, times: usize) {
    assert_eq!(world.http().gets().await.len(), times);
}

#[then(expr = "{int} message(s) should be sent")]
async fn messages_sent(world: &mut ReviewWorld, count: usize) {
    let sent = world.http().sent_texts().await;
    assert_eq!(sent.len(), count, "sent messages: {:?}", sent);
}

#[then(expr = "the last message should contain {string}")]
async fn last_message_contains(world: &mut ReviewWorld, expected: String) {
    let sent = world.http().sent_texts().await;
    let last = sent.last().expect("no message sent");
    assert!(
        last.contains(&expected),
        "Expected message to contain '{}', got '{}'",
        expected,
        last
    );
}

#[then(expr = "the cursor should be {int}")]
fn cursor_should_be(world: &mut ReviewWorld, expected: i64) {
    let supervisor = world.supervisor.as_ref().expect("no supervisor");
    assert_eq!(supervisor.cursor().seconds(), expected);
}

#[then(expr = "the next poll should be in {int} seconds")]
fn next_poll_in(world: &mut ReviewWorld, seconds: u64) {
    let result = world.last_step.as_ref().expect("no cycle has run");
    let delay = result.as_ref().expect("cycle escaped the loop");
    assert_eq!(*delay, Duration::from_secs(seconds));
}

#[then("the loop should continue")]
fn loop_should_continue(world: &mut ReviewWorld) {
    let result = world.last_step.as_ref().expect("no cycle has run");
    assert!(result.is_ok(), "loop stopped: {:?}", result);
}

#[then("the loop should stop because the credentials were revoked")]
fn loop_should_stop(world: &mut ReviewWorld) {
    let result = world.last_step.as_ref().expect("no cycle has run");
    match result {
        Err(review_notifier::ReviewNotifierError::CredentialRevoked(_)) => {}
        other => panic!("expected CredentialRevoked, got {:?}", other),
    }
}
