//! Test doubles shared by the step definitions

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;

use review_notifier::io::{HttpClient, HttpResponse};
use review_notifier::ReviewNotifierError;

/// A recorded HTTP request
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Plays the review API on GET and the Bot API on POST.
///
/// GET replies are consumed in order; once exhausted an empty review list is
/// returned. POST replies default to a successful `sendMessage`.
#[derive(Debug, Default)]
pub struct FakeHttpClient {
    pub get_replies: Arc<RwLock<VecDeque<review_notifier::Result<HttpResponse>>>>,
    pub post_reply: Arc<RwLock<Option<HttpResponse>>>,
    pub requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl FakeHttpClient {
    pub async fn push_get(&self, status: u16, body: &str) {
        self.get_replies.write().await.push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub async fn push_get_error(&self, message: &str) {
        self.get_replies
            .write()
            .await
            .push_back(Err(ReviewNotifierError::Transport(message.to_string())));
    }

    pub async fn sent_texts(&self) -> Vec<String> {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.method == "POST")
            .filter_map(|r| r.param("text").map(str::to_string))
            .collect()
    }

    pub async fn gets(&self) -> Vec<RecordedRequest> {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.method == "GET")
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl HttpClient for FakeHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> review_notifier::Result<HttpResponse> {
        self.requests.write().await.push(RecordedRequest {
            method: "GET".to_string(),
            url: url.to_string(),
            headers: owned(headers),
            params: owned(query),
        });
        self.get_replies
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Ok(HttpResponse {
                    status: 200,
                    body: r#"{"homeworks": []}"#.to_string(),
                })
            })
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> review_notifier::Result<HttpResponse> {
        self.requests.write().await.push(RecordedRequest {
            method: "POST".to_string(),
            url: url.to_string(),
            headers: Vec::new(),
            params: owned(params),
        });
        Ok(self
            .post_reply
            .read()
            .await
            .clone()
            .unwrap_or_else(|| HttpResponse {
                status: 200,
                body: r#"{"ok":true,"result":{"message_id":1}}"#.to_string(),
            }))
    }
}
