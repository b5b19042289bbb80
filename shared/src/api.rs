use async_trait::async_trait;
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use super::*;

#[async_trait]
pub trait SupportApi: Send + Sync {
    async fn create_conversation(&self, content: &str) -> Result<Conversation, TransportError>;

    async fn get_conversation(&self, token: &str) -> Result<Conversation, TransportError>;

    async fn reply_to_conversation(
        &self,
        token: &str,
        content: &str,
    ) -> Result<Conversation, TransportError>;

    async fn rate_conversation(
        &self,
        token: &str,
        rating: RatingType,
    ) -> Result<Conversation, TransportError>;

    async fn track_url_access(&self, token: &str, url: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnprocessableReason {
    MonthlyLimit,
    ContentPolicy,
    Unclassified,
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request rejected (422): {reason:?}")]
    Unprocessable { reason: UnprocessableReason },
    #[error("access forbidden (403)")]
    Forbidden,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("network failure: {0}")]
    Network(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

const MONTHLY_LIMIT_MARKERS: &[&str] = &["monthly limit", "monthly_limit"];
const CONTENT_POLICY_MARKERS: &[&str] = &["inappropriate", "policy", "prohibited", "ng word"];

impl TransportError {
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            422 => Self::Unprocessable {
                reason: unprocessable_reason(body),
            },
            403 => Self::Forbidden,
            other => Self::Status(other),
        }
    }
}

fn unprocessable_reason(body: &str) -> UnprocessableReason {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let errors = parsed
        .errors
        .iter()
        .map(|e| e.to_lowercase())
        .collect::<Vec<_>>();

    let mentions = |markers: &[&str]| {
        errors
            .iter()
            .any(|e| markers.iter().any(|marker| e.contains(marker)))
    };

    if mentions(MONTHLY_LIMIT_MARKERS) {
        UnprocessableReason::MonthlyLimit
    } else if mentions(CONTENT_POLICY_MARKERS) {
        UnprocessableReason::ContentPolicy
    } else {
        UnprocessableReason::Unclassified
    }
}
