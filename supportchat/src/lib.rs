pub use crate::classifier::{Classified, ErrorClassifier, FailureCategory};
pub use crate::client::Client;
pub use crate::config::{Config, OrchestratorConfig};
pub use crate::message::{ConversationStatus, FaqTile, Message, MessageId, MessageKind};
pub use crate::orchestrator::Orchestrator;
pub use crate::rating::RatingState;
pub use crate::session::Session;

pub use shared::{
    AnswerOption, ChatSetting, Conversation, ConversationState, RatingType, SupportApi,
    TransportError,
};

pub mod classifier;
pub mod client;
pub mod config;
pub mod dedup;
pub mod message;
pub mod orchestrator;
pub mod poller;
pub mod rating;
pub mod scheduler;
pub mod sequencer;
pub mod session;
pub mod timeline;

#[cfg(test)]
pub(crate) mod testing;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
