//! Review-status API client

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::io::{HttpClient, HttpResponse};
use crate::source::{PollResponse, StatusRecord, StatusSource};
use crate::state::PollCursor;
use crate::ReviewNotifierError;

/// Body fields that mark a server-side rejection
const FAILURE_FIELDS: [&str; 2] = ["code", "error"];

/// Polls the homework status endpoint with an OAuth token
pub struct HomeworkPoller {
    endpoint: String,
    authorization: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for HomeworkPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeworkPoller")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HomeworkPoller {
    pub fn new(config: &ApiConfig, http: Arc<dyn HttpClient>) -> crate::Result<Self> {
        let token = config.token.as_deref().ok_or_else(|| {
            ReviewNotifierError::Config("API token has not been resolved".to_string())
        })?;

        tracing::debug!("Created HomeworkPoller for {}", config.endpoint);

        Ok(Self {
            endpoint: config.endpoint.clone(),
            authorization: format!("OAuth {}", token),
            http,
        })
    }
}

/// Decode a response body, treating `code`/`error` fields, non-2xx statuses
/// and undecodable payloads as server failures.
pub fn decode_response(response: &HttpResponse) -> crate::Result<PollResponse> {
    let status = response.status;
    let value: serde_json::Value = serde_json::from_str(&response.body).map_err(|e| {
        ReviewNotifierError::ServerFailure(format!(
            "undecodable response (status {}): {}",
            status, e
        ))
    })?;

    for field in FAILURE_FIELDS {
        if let Some(reason) = value.get(field) {
            let reason = match reason {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(ReviewNotifierError::ServerFailure(format!(
                "server rejected the request (status {}): {} = {}",
                status, field, reason
            )));
        }
    }

    if !response.is_success() {
        return Err(ReviewNotifierError::ServerFailure(format!(
            "unexpected status {}",
            status
        )));
    }

    let items = value
        .get("homeworks")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| {
            ReviewNotifierError::ServerFailure(
                "unexpected response shape: no homeworks list".to_string(),
            )
        })?;

    // Records are decoded one by one so a single bad entry cannot pin the cursor
    let records = items
        .iter()
        .filter_map(|item| match StatusRecord::deserialize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Dropping undecodable review record {}: {}", item, e);
                None
            }
        })
        .collect();

    let next_cursor = match value.get("current_date") {
        None | Some(serde_json::Value::Null) => None,
        Some(date) => {
            let cursor = date.as_i64();
            if cursor.is_none() {
                tracing::warn!("Ignoring non-integer current_date {}", date);
            }
            cursor
        }
    };

    Ok(PollResponse {
        records,
        next_cursor,
    })
}

#[async_trait]
impl StatusSource for HomeworkPoller {
    async fn poll(&self, cursor: PollCursor) -> crate::Result<PollResponse> {
        let from_date = cursor.to_string();
        tracing::debug!("Polling {} from_date={}", self.endpoint, from_date);

        let response = self
            .http
            .get(
                &self.endpoint,
                &[("Authorization", self.authorization.as_str())],
                &[("from_date", from_date.as_str())],
            )
            .await?;

        let decoded = decode_response(&response)?;
        tracing::debug!(
            "Poll returned {} record(s), current_date={:?}",
            decoded.records.len(),
            decoded.next_cursor
        );
        Ok(decoded)
    }
}
