//! Status source trait and the records it yields

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::state::PollCursor;

/// Identifier of a reviewed item; the API sends numbers, older variants strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// One reviewed item as reported by the remote endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    /// Raw status token, validated by the classifier
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
    #[serde(rename = "homework_name", default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default)]
    pub lesson_name: Option<String>,
    #[serde(default)]
    pub reviewer_comment: Option<String>,
    #[serde(default)]
    pub date_updated: Option<String>,
}

/// Null or absent becomes empty and other non-strings keep their JSON text,
/// so a malformed record fails classification instead of the whole poll.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    })
}

/// Decoded body of a successful poll. Records are most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    #[serde(rename = "homeworks")]
    pub records: Vec<StatusRecord>,
    #[serde(rename = "current_date", default)]
    pub next_cursor: Option<i64>,
}

/// Anything that can be polled for review results after a cursor
#[async_trait]
pub trait StatusSource: Send + Sync + fmt::Debug {
    async fn poll(&self, cursor: PollCursor) -> crate::Result<PollResponse>;
}
