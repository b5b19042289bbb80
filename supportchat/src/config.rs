use std::time::Duration;

use indoc::indoc;
use miette::{Context, IntoDiagnostic, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub identifier: String,
    pub fingerprint: String,
    pub send_default_rating_on_discard: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_base_url = std::env::var("SUPPORTCHAT_API_BASE_URL")
            .into_diagnostic()
            .wrap_err("Could not find SUPPORTCHAT_API_BASE_URL env var")?;
        let identifier = std::env::var("SUPPORTCHAT_IDENTIFIER")
            .into_diagnostic()
            .wrap_err("Could not find SUPPORTCHAT_IDENTIFIER env var")?;
        let fingerprint = std::env::var("SUPPORTCHAT_FINGERPRINT")
            .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());
        let send_default_rating_on_discard =
            match std::env::var("SUPPORTCHAT_DEFAULT_RATING_ON_DISCARD") {
                Ok(value) => parse_flag(&value).wrap_err(
                    "SUPPORTCHAT_DEFAULT_RATING_ON_DISCARD must be true/false",
                )?,
                Err(_) => false,
            };

        Ok(Self {
            api_base_url,
            identifier,
            fingerprint,
            send_default_rating_on_discard,
        })
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            send_default_rating_on_discard: self.send_default_rating_on_discard,
            ..OrchestratorConfig::default()
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(miette::miette!("not a boolean: {other}")),
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    /// Submit an implicit `none` rating when an unrated Rating Message is
    /// superseded by a new question or the chat is closed.
    pub send_default_rating_on_discard: bool,
    pub rating_prompt: String,
    pub thank_you_message: Option<String>,
    pub separator_message: String,
    pub options_header: String,
    pub contact_link_label: String,
    pub reference_label: String,
    /// `{url}` is replaced by the tile's related URL.
    pub related_link_template: String,
    pub option_terminator: char,
    pub access_blocked_message: String,
    pub transient_failure_message: String,
    pub content_policy_message: String,
    pub chat_unavailable_message: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            send_default_rating_on_discard: false,
            rating_prompt: "Thank you for contacting us. To help us improve, please rate this answer.".into(),
            thank_you_message: Some(
                indoc! {"
                    Thank you for your feedback.
                    Your rating helps us improve the quality of our answers.

                    If you have another question, just send a new message to start a new chat."}
                .into(),
            ),
            separator_message: "A new chat starts from here".into(),
            options_header: "Is your question one of these?".into(),
            contact_link_label: "Contact page".into(),
            reference_label: "Reference ID".into(),
            related_link_template: r#"For more details, see <a href="{url}" target="_blank">this page</a>."#.into(),
            option_terminator: '?',
            access_blocked_message: "Chat is temporarily unavailable. Please try again later.".into(),
            transient_failure_message: "Sorry, the service is temporarily unavailable. Please wait a moment and try again.".into(),
            content_policy_message: indoc! {"
                Your message could not be sent because it may contain inappropriate content.
                Please edit it and try again. Repeated violations will temporarily disable the chat."}
            .into(),
            chat_unavailable_message: "Chat is currently unavailable.".into(),
        }
    }
}
