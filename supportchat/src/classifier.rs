use std::fmt;
use std::time::Duration;

use shared::{ChatSetting, TransportError, UnprocessableReason};

use crate::config::OrchestratorConfig;

/// Delay between dropping the loading placeholder and showing the failure.
pub const FAILURE_REVEAL_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    TransientTransportFailure,
    ContentPolicyViolation,
    MonthlyLimitExceeded,
    AccessBlocked,
    RatingSubmissionFailure,
}

impl FailureCategory {
    pub fn of(error: &TransportError) -> Self {
        match error {
            TransportError::Unprocessable {
                reason: UnprocessableReason::MonthlyLimit,
            } => Self::MonthlyLimitExceeded,
            TransportError::Unprocessable { .. } => Self::ContentPolicyViolation,
            TransportError::Forbidden => Self::AccessBlocked,
            TransportError::Status(_)
            | TransportError::Timeout
            | TransportError::Network(_)
            | TransportError::Decode(_) => Self::TransientTransportFailure,
        }
    }

    pub fn is_retryable(self) -> bool {
        self == Self::TransientTransportFailure
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TransientTransportFailure => "transient_transport_failure",
            Self::ContentPolicyViolation => "content_policy_violation",
            Self::MonthlyLimitExceeded => "monthly_limit_exceeded",
            Self::AccessBlocked => "access_blocked",
            Self::RatingSubmissionFailure => "rating_submission_failure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub category: FailureCategory,
    pub message: String,
}

pub struct ErrorClassifier<'a> {
    setting: &'a ChatSetting,
    config: &'a OrchestratorConfig,
}

impl<'a> ErrorClassifier<'a> {
    pub fn new(setting: &'a ChatSetting, config: &'a OrchestratorConfig) -> Self {
        Self { setting, config }
    }

    pub fn classify(&self, error: &TransportError) -> Classified {
        let category = FailureCategory::of(error);

        let message = match category {
            FailureCategory::MonthlyLimitExceeded => self.monthly_limit_message(),
            FailureCategory::ContentPolicyViolation => self.config.content_policy_message.clone(),
            FailureCategory::AccessBlocked => self.config.access_blocked_message.clone(),
            FailureCategory::TransientTransportFailure
            | FailureCategory::RatingSubmissionFailure => {
                self.config.transient_failure_message.clone()
            }
        };

        Classified { category, message }
    }

    pub fn monthly_limit_message(&self) -> String {
        let mut message = self.setting.monthly_limit_message.clone();
        if let Some(url) = self.setting.monthly_limit_url.as_deref().filter(|u| !u.is_empty()) {
            message.push_str(&format!("\n\n<a href=\"{url}\" target=\"_blank\">{url}</a>"));
        }
        message
    }
}
