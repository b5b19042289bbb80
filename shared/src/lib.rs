use serde::{Deserialize, Serialize};

pub mod api;

pub use api::{SupportApi, TransportError, UnprocessableReason};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Initial,
    AnswerPreparing,
    ReplyWaiting,
    ReplyReceived,
    Top1,
    Top3,
    Unmatched,
    Failed,
}

impl ConversationState {
    pub fn needs_polling(self) -> bool {
        matches!(
            self,
            Self::Initial | Self::AnswerPreparing | Self::ReplyReceived
        )
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum RatingType {
    #[default]
    None,
    Good,
    Bad,
}

impl From<RatingType> for u8 {
    fn from(value: RatingType) -> Self {
        match value {
            RatingType::None => 1,
            RatingType::Good => 2,
            RatingType::Bad => 3,
        }
    }
}

impl TryFrom<u8> for RatingType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::None),
            2 => Ok(Self::Good),
            3 => Ok(Self::Bad),
            other => Err(format!("unknown rating_type_id {other}")),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Top1Match,
    Top3Match,
    Additional,
    Unmatched,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RagResult {
    pub question: String,
    pub answer: String,
    pub score: f64,
    #[serde(default)]
    pub related_url: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub content: String,
    pub simple_content: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Answer {
    #[serde(default)]
    pub id: Option<i64>,
    pub content: String,
    pub answer_type: AnswerType,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    #[serde(default)]
    pub rag_results: Vec<RagResult>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub answer: Option<Answer>,
    #[serde(default)]
    pub rag_results: Vec<RagResult>,
}

impl Question {
    /// Ranked results for this question, preferring the ones attached to the answer.
    pub fn ranked_results(&self) -> &[RagResult] {
        match &self.answer {
            Some(answer) if !answer.rag_results.is_empty() => &answer.rag_results,
            _ => &self.rag_results,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Conversation {
    pub token: String,
    pub cid: String,
    pub state: ConversationState,
    #[serde(default)]
    pub rating_type_id: RatingType,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub contact_page_url: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatSetting {
    pub welcome_message: String,
    pub matched_message: String,
    pub unmatched_message: String,
    #[serde(rename = "conversation_monthly_limit_message", default)]
    pub monthly_limit_message: String,
    #[serde(rename = "conversation_monthly_limit_url", default)]
    pub monthly_limit_url: Option<String>,
    #[serde(default = "default_true")]
    pub chat_available: bool,
    #[serde(default)]
    pub monthly_limit_exceeded: bool,
    #[serde(default)]
    pub header_label: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AccessTokenRequest {
    pub identifier: String,
    pub fingerprint: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AccessTokenResponse {
    pub token: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RatingRequest {
    pub rating_type_id: RatingType,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UrlAccessRequest {
    pub url: String,
}
