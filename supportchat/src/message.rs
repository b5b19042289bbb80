use chrono::{DateTime, Utc};
use shared::{AnswerOption, Conversation, ConversationState, RatingType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

/// Conversation status captured when a message was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationStatus {
    pub state: ConversationState,
    pub token: Option<String>,
    pub rating_type_id: Option<RatingType>,
}

impl ConversationStatus {
    pub fn of(conversation: &Conversation) -> Self {
        Self {
            state: conversation.state,
            token: Some(conversation.token.clone()),
            rating_type_id: Some(conversation.rating_type_id),
        }
    }

    pub fn failed() -> Self {
        Self {
            state: ConversationState::Failed,
            token: None,
            rating_type_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaqTile {
    pub question: String,
    pub answer: String,
    pub score: f64,
    pub related_url: Option<String>,
    pub related_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    User,
    Company,
    Options {
        question_id: i64,
        options: Vec<AnswerOption>,
    },
    FaqTiles {
        tiles: Vec<FaqTile>,
    },
    Separator,
    Rating {
        token: String,
        state: ConversationState,
    },
}

impl MessageKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Company => "company",
            Self::Options { .. } => "options",
            Self::FaqTiles { .. } => "faq_tiles",
            Self::Separator => "separator",
            Self::Rating { .. } => "rating",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub kind: MessageKind,
    pub content: String,
    pub status: Option<ConversationStatus>,
}

impl MessageDraft {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::User,
            content: content.into(),
            status: None,
        }
    }

    pub fn company(content: impl Into<String>, status: Option<ConversationStatus>) -> Self {
        Self {
            kind: MessageKind::Company,
            content: content.into(),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub status: Option<ConversationStatus>,
}

const SENTENCE_TERMINATORS: &[char] = &['.', '?', '!', '。', '？', '！'];

/// `content` with `terminator` appended unless it already ends a sentence.
pub fn with_terminator(content: &str, terminator: char) -> String {
    let trimmed = content.trim_end();
    if trimmed.ends_with(SENTENCE_TERMINATORS) || trimmed.ends_with(terminator) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{terminator}")
    }
}
